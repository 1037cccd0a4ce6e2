use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{Buyer, Order, OrderItem, OrderStatus, Product, Supplier};

use crate::entity::{Entity, ForeignKey, OnDelete};
use crate::value::Value;

impl Entity for Order {
    const TABLE: &'static str = "orders";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "order_number",
        "buyer_id",
        "supplier_id",
        "status",
        "total_amount",
        "currency",
        "order_date",
        "delivery_date",
        "notes",
        "is_active",
        "created_at",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["order_number"];
    const FOREIGN_KEYS: &'static [ForeignKey] = &[
        ForeignKey::new("buyer_id", Buyer::TABLE, OnDelete::Restrict),
        ForeignKey::new("supplier_id", Supplier::TABLE, OnDelete::SetNull),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.order_number).into(),
            self.buyer_id.into(),
            self.supplier_id.into(),
            self.status.as_str().into(),
            self.total_amount.into(),
            (&self.currency).into(),
            self.order_date.into(),
            self.delivery_date.into(),
            (&self.notes).into(),
            self.is_active.into(),
            self.created_at.into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        OrderRow::from_row(row).map(|r| Self {
            id: r.id,
            order_number: r.order_number,
            buyer_id: r.buyer_id,
            supplier_id: r.supplier_id,
            status: OrderStatus::from_str(&r.status).unwrap_or_default(),
            total_amount: r.total_amount,
            currency: r.currency,
            order_date: r.order_date,
            delivery_date: r.delivery_date,
            notes: r.notes,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    buyer_id: Uuid,
    supplier_id: Option<Uuid>,
    status: String,
    total_amount: f64,
    currency: String,
    order_date: DateTime<Utc>,
    delivery_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Entity for OrderItem {
    const TABLE: &'static str = "order_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "order_id",
        "product_id",
        "quantity",
        "unit_price",
        "line_total",
        "created_at",
    ];
    const FOREIGN_KEYS: &'static [ForeignKey] = &[
        ForeignKey::new("order_id", Order::TABLE, OnDelete::Cascade),
        ForeignKey::new("product_id", Product::TABLE, OnDelete::Restrict),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.order_id.into(),
            self.product_id.into(),
            self.quantity.into(),
            self.unit_price.into(),
            self.line_total.into(),
            self.created_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        OrderItemRow::from_row(row).map(|r| Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            quantity: r.quantity,
            unit_price: r.unit_price,
            line_total: r.line_total,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: f64,
    unit_price: f64,
    line_total: f64,
    created_at: DateTime<Utc>,
}
