//! Order endpoints. An order and its items are written in one transaction.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use foodx_database::{field, Query as StoreQuery, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::{NewOrder, Order, OrderItem, OrderStatus, OrderWithItems};
use foodx_utils::transaction::finish;
use foodx_utils::{validate_model, FoodxError, FoodxResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::metrics::record_change;
use crate::AppState;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub buyer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// GET /api/v1/orders
pub async fn list_orders<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(filter): Query<OrderFilter>,
) -> FoodxResult<Json<Vec<Order>>> {
    let mut query = StoreQuery::new().order_by_desc("order_date");
    if let Some(status) = filter.status.as_deref() {
        let status = OrderStatus::from_str(status)
            .ok_or_else(|| FoodxError::validation("status", format!("Unknown status '{}'", status)))?;
        query = query.filter(field("status").eq(status.as_str()));
    }
    if let Some(buyer_id) = filter.buyer_id {
        query = query.filter(field("buyer_id").eq(buyer_id));
    }
    if let Some(supplier_id) = filter.supplier_id {
        query = query.filter(field("supplier_id").eq(supplier_id));
    }

    Ok(Json(state.factory.unit_of_work().orders().query(query).await?))
}

/// GET /api/v1/orders/:id
pub async fn get_order<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<OrderWithItems>> {
    let uow = state.factory.unit_of_work();
    let order = load_order(&uow, id).await?;
    let items = order_items(&uow, order.id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

/// POST /api/v1/orders
///
/// Nothing is stored unless the buyer, the supplier and every product exist.
pub async fn create_order<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Json(new_order): Json<NewOrder>,
) -> FoodxResult<(StatusCode, Json<OrderWithItems>)> {
    validate_model(&new_order)?;
    for item in &new_order.items {
        validate_model(item)?;
    }

    let uow = state.factory.unit_of_work();
    uow.begin_transaction().await?;
    let result = place_order(&uow, new_order, Utc::now()).await;
    let created = finish(&uow, result).await?;

    record_change("order", "created");
    info!(
        order_id = %created.order.id,
        order_number = %created.order.order_number,
        items = created.items.len(),
        total = created.order.total_amount,
        "Order created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// PUT /api/v1/orders/:id/status
///
/// Delivered and cancelled orders are final.
pub async fn update_order_status<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> FoodxResult<Json<Order>> {
    let status = OrderStatus::from_str(&change.status)
        .ok_or_else(|| FoodxError::validation("status", format!("Unknown status '{}'", change.status)))?;

    let uow = state.factory.unit_of_work();
    let mut order = load_order(&uow, id).await?;
    if matches!(order.status, OrderStatus::Delivered | OrderStatus::Cancelled) && order.status != status {
        return Err(FoodxError::conflict(format!(
            "Order {} is {} and can no longer change",
            order.order_number,
            order.status.as_str()
        )));
    }

    let previous = order.status;
    order.status = status;
    order.updated_at = Some(Utc::now());
    let order = uow.orders().update(order).await?;

    record_change("order", status.as_str());
    info!(order_id = %order.id, from = previous.as_str(), to = status.as_str(), "Order status changed");
    Ok(Json(order))
}

async fn place_order<U: UnitOfWork>(uow: &U, new_order: NewOrder, now: DateTime<Utc>) -> FoodxResult<OrderWithItems> {
    if uow.buyers().get_by_id(new_order.buyer_id).await?.is_none() {
        return Err(FoodxError::validation(
            "buyer_id",
            format!("Buyer {} does not exist", new_order.buyer_id),
        ));
    }
    if let Some(supplier_id) = new_order.supplier_id {
        if uow.suppliers().get_by_id(supplier_id).await?.is_none() {
            return Err(FoodxError::validation(
                "supplier_id",
                format!("Supplier {} does not exist", supplier_id),
            ));
        }
    }

    let order = Order {
        id: Uuid::new_v4(),
        order_number: next_order_number(uow, now).await?,
        buyer_id: new_order.buyer_id,
        supplier_id: new_order.supplier_id,
        status: OrderStatus::Pending,
        total_amount: round_cents(new_order.total_amount()),
        currency: new_order
            .currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        order_date: now,
        delivery_date: new_order.delivery_date,
        notes: new_order.notes,
        is_active: true,
        created_at: now,
        updated_at: None,
    };
    let order = uow.orders().add(order).await?;

    let mut items = Vec::with_capacity(new_order.items.len());
    for item in new_order.items {
        if uow.products().get_by_id(item.product_id).await?.is_none() {
            return Err(FoodxError::validation(
                "product_id",
                format!("Product {} does not exist", item.product_id),
            ));
        }
        let line = OrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: round_cents(item.quantity * item.unit_price),
            created_at: now,
        };
        items.push(uow.order_items().add(line).await?);
    }

    Ok(OrderWithItems { order, items })
}

/// `ORD-{yyyymmdd}-{NNNN}`, numbered per day.
pub async fn next_order_number<U: UnitOfWork>(uow: &U, now: DateTime<Utc>) -> FoodxResult<String> {
    let prefix = format!("ORD-{}-", now.format("%Y%m%d"));
    let existing = uow
        .orders()
        .count(Some(field("order_number").starts_with(prefix.clone())))
        .await?;
    Ok(format_order_number(&prefix, existing + 1))
}

fn format_order_number(prefix: &str, sequence: i64) -> String {
    format!("{}{:04}", prefix, sequence)
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

async fn load_order<U: UnitOfWork>(uow: &U, id: Uuid) -> FoodxResult<Order> {
    uow.orders()
        .get_by_id(id)
        .await?
        .ok_or_else(|| FoodxError::not_found(format!("Order {}", id)))
}

async fn order_items<U: UnitOfWork>(uow: &U, order_id: Uuid) -> FoodxResult<Vec<OrderItem>> {
    Ok(uow
        .order_items()
        .query(
            StoreQuery::new()
                .filter(field("order_id").eq(order_id))
                .order_by_asc("created_at"),
        )
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use foodx_database::InMemoryDatabase;
    use foodx_models::{Buyer, BuyerInput};

    #[test]
    fn test_order_number_format() {
        assert_eq!(format_order_number("ORD-20260301-", 7), "ORD-20260301-0007");
        assert_eq!(format_order_number("ORD-20260301-", 12345), "ORD-20260301-12345");
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(10.0 / 3.0), 3.33);
        assert_eq!(round_cents(10.0), 10.0);
    }

    #[tokio::test]
    async fn test_order_numbers_restart_each_day() {
        let db = InMemoryDatabase::new();
        let uow = db.unit_of_work();
        let day = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let buyer = uow
            .buyers()
            .add(Buyer::new(
                BuyerInput {
                    company_name: "Fresh Market".into(),
                    email: "orders@fresh.example".into(),
                    ..Default::default()
                },
                day,
            ))
            .await
            .unwrap();

        assert_eq!(next_order_number(&uow, day).await.unwrap(), "ORD-20260301-0001");
        uow.orders()
            .add(Order {
                id: Uuid::new_v4(),
                order_number: "ORD-20260301-0001".into(),
                buyer_id: buyer.id,
                supplier_id: None,
                status: OrderStatus::Pending,
                total_amount: 0.0,
                currency: "USD".into(),
                order_date: day,
                delivery_date: None,
                notes: None,
                is_active: true,
                created_at: day,
                updated_at: None,
            })
            .await
            .unwrap();

        assert_eq!(next_order_number(&uow, day).await.unwrap(), "ORD-20260301-0002");
        let next_day = day + chrono::Duration::days(1);
        assert_eq!(next_order_number(&uow, next_day).await.unwrap(), "ORD-20260302-0001");
    }
}
