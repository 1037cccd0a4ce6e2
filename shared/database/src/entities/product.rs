use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use foodx_models::{Product, Supplier};

use crate::entity::{Entity, ForeignKey, OnDelete};
use crate::value::Value;

impl Entity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "sku",
        "description",
        "category",
        "sub_category",
        "unit",
        "price",
        "min_order_quantity",
        "packaging_type",
        "is_kosher",
        "is_organic",
        "is_gluten_free",
        "is_vegan",
        "certifications",
        "country_of_origin",
        "brand",
        "shelf_life",
        "storage_requirements",
        "image_url",
        "supplier_id",
        "is_active",
        "created_by",
        "created_at",
        "updated_by",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["sku"];
    const FOREIGN_KEYS: &'static [ForeignKey] =
        &[ForeignKey::new("supplier_id", Supplier::TABLE, OnDelete::SetNull)];

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            (&self.name).into(),
            (&self.sku).into(),
            (&self.description).into(),
            (&self.category).into(),
            (&self.sub_category).into(),
            (&self.unit).into(),
            self.price.into(),
            self.min_order_quantity.into(),
            (&self.packaging_type).into(),
            self.is_kosher.into(),
            self.is_organic.into(),
            self.is_gluten_free.into(),
            self.is_vegan.into(),
            (&self.certifications).into(),
            (&self.country_of_origin).into(),
            (&self.brand).into(),
            (&self.shelf_life).into(),
            (&self.storage_requirements).into(),
            (&self.image_url).into(),
            self.supplier_id.into(),
            self.is_active.into(),
            (&self.created_by).into(),
            self.created_at.into(),
            (&self.updated_by).into(),
            self.updated_at.into(),
        ]
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        ProductRow::from_row(row).map(Into::into)
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    sku: Option<String>,
    description: Option<String>,
    category: Option<String>,
    sub_category: Option<String>,
    unit: Option<String>,
    price: f64,
    min_order_quantity: Option<f64>,
    packaging_type: Option<String>,
    is_kosher: bool,
    is_organic: bool,
    is_gluten_free: bool,
    is_vegan: bool,
    certifications: Option<String>,
    country_of_origin: Option<String>,
    brand: Option<String>,
    shelf_life: Option<String>,
    storage_requirements: Option<String>,
    image_url: Option<String>,
    supplier_id: Option<Uuid>,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            sku: row.sku,
            description: row.description,
            category: row.category,
            sub_category: row.sub_category,
            unit: row.unit,
            price: row.price,
            min_order_quantity: row.min_order_quantity,
            packaging_type: row.packaging_type,
            is_kosher: row.is_kosher,
            is_organic: row.is_organic,
            is_gluten_free: row.is_gluten_free,
            is_vegan: row.is_vegan,
            certifications: row.certifications,
            country_of_origin: row.country_of_origin,
            brand: row.brand,
            shelf_life: row.shelf_life,
            storage_requirements: row.storage_requirements,
            image_url: row.image_url,
            supplier_id: row.supplier_id,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}
