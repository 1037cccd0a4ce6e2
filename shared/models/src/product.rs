//! Product catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::product_brief::validate_http_url;

/// A product listed in the catalog, usually offered by one supplier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub unit: Option<String>,
    pub price: f64,
    pub min_order_quantity: Option<f64>,
    pub packaging_type: Option<String>,
    pub is_kosher: bool,
    pub is_organic: bool,
    pub is_gluten_free: bool,
    pub is_vegan: bool,
    pub certifications: Option<String>,
    pub country_of_origin: Option<String>,
    pub brand: Option<String>,
    pub shelf_life: Option<String>,
    pub storage_requirements: Option<String>,
    pub image_url: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(input: ProductInput, created_by: Option<String>, now: DateTime<Utc>) -> Self {
        let mut product = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            sku: None,
            description: None,
            category: None,
            sub_category: None,
            unit: None,
            price: 0.0,
            min_order_quantity: None,
            packaging_type: None,
            is_kosher: false,
            is_organic: false,
            is_gluten_free: false,
            is_vegan: false,
            certifications: None,
            country_of_origin: None,
            brand: None,
            shelf_life: None,
            storage_requirements: None,
            image_url: None,
            supplier_id: None,
            is_active: true,
            created_by,
            created_at: now,
            updated_by: None,
            updated_at: None,
        };
        product.apply(input);
        product
    }

    /// Overwrites the editable fields from `input`.
    pub fn apply(&mut self, input: ProductInput) {
        self.name = input.name.trim().to_string();
        self.sku = input.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.description = input.description;
        self.category = input.category;
        self.sub_category = input.sub_category;
        self.unit = input.unit;
        self.price = input.price;
        self.min_order_quantity = input.min_order_quantity;
        self.packaging_type = input.packaging_type;
        self.is_kosher = input.is_kosher;
        self.is_organic = input.is_organic;
        self.is_gluten_free = input.is_gluten_free;
        self.is_vegan = input.is_vegan;
        self.certifications = input.certifications;
        self.country_of_origin = input.country_of_origin;
        self.brand = input.brand;
        self.shelf_life = input.shelf_life;
        self.storage_requirements = input.storage_requirements;
        self.image_url = input.image_url;
        self.supplier_id = input.supplier_id;
    }
}

/// Create/update payload for a product.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Default)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required and must not exceed 200 characters"))]
    pub name: String,
    #[validate(length(max = 100, message = "SKU must not exceed 100 characters"))]
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub category: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    #[serde(default)]
    pub price: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub min_order_quantity: Option<f64>,
    #[serde(default)]
    pub packaging_type: Option<String>,
    #[serde(default)]
    pub is_kosher: bool,
    #[serde(default)]
    pub is_organic: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub certifications: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub shelf_life: Option<String>,
    #[serde(default)]
    pub storage_requirements: Option<String>,
    #[validate(custom = "validate_http_url")]
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
}

/// Number of active products in one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}
