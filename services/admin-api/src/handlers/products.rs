//! Catalog endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use foodx_database::{field, search_query, Page, ProductQueries, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::{CategoryCount, Product, ProductInput};
use foodx_utils::http::CallerId;
use foodx_utils::{validate_model, FoodxError, FoodxResult};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::metrics::record_change;
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub organic: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default = "first_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn first_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// GET /api/v1/products
pub async fn list_products<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(params): Query<ProductListParams>,
) -> FoodxResult<Json<Page<Product>>> {
    let mut query = search_query(params.search.as_deref().unwrap_or_default());
    if let Some(category) = params.category.filter(|c| !c.trim().is_empty()) {
        query = query.filter(field("category").eq(category));
    }
    if let Some(supplier_id) = params.supplier_id {
        query = query.filter(field("supplier_id").eq(supplier_id));
    }
    if let Some(organic) = params.organic {
        query = query.filter(field("is_organic").eq(organic));
    }
    if let Some(min) = params.min_price {
        query = query.filter(field("price").ge(min));
    }
    if let Some(max) = params.max_price {
        query = query.filter(field("price").le(max));
    }

    let page = state
        .factory
        .unit_of_work()
        .products()
        .page(query, params.page, params.page_size)
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/products/:id
pub async fn get_product<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Product>> {
    let uow = state.factory.unit_of_work();
    Ok(Json(load_product(&uow, id).await?))
}

/// POST /api/v1/products
pub async fn create_product<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    caller: CallerId,
    Json(input): Json<ProductInput>,
) -> FoodxResult<(StatusCode, Json<Product>)> {
    validate_model(&input)?;
    let uow = state.factory.unit_of_work();
    check_references(&uow, &input, None).await?;

    let product = Product::new(input, Some(caller.0), Utc::now());
    let product = uow.products().add(product).await?;

    record_change("product", "created");
    info!(product_id = %product.id, sku = ?product.sku, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/v1/products/:id
pub async fn update_product<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    caller: CallerId,
    Json(input): Json<ProductInput>,
) -> FoodxResult<Json<Product>> {
    validate_model(&input)?;
    let uow = state.factory.unit_of_work();
    let mut product = load_product(&uow, id).await?;
    check_references(&uow, &input, Some(id)).await?;

    product.apply(input);
    product.updated_by = Some(caller.0);
    product.updated_at = Some(Utc::now());
    let product = uow.products().update(product).await?;

    record_change("product", "updated");
    info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

/// DELETE /api/v1/products/:id
///
/// Products still referenced by order items cannot be deleted (409).
pub async fn delete_product<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<StatusCode> {
    let deleted = state.factory.unit_of_work().products().delete(id).await?;
    if !deleted {
        return Err(FoodxError::not_found(format!("Product {}", id)));
    }
    record_change("product", "deleted");
    info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/products/categories
pub async fn product_categories<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
) -> FoodxResult<Json<Vec<CategoryCount>>> {
    let counts = state.factory.unit_of_work().products().count_by_category().await?;
    Ok(Json(counts))
}

#[derive(Debug, Deserialize)]
pub struct SkuParams {
    pub sku: String,
    pub exclude_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SkuAvailability {
    pub sku: String,
    pub available: bool,
}

/// GET /api/v1/products/sku-available
pub async fn sku_available<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(params): Query<SkuParams>,
) -> FoodxResult<Json<SkuAvailability>> {
    let sku = params.sku.trim().to_string();
    if sku.is_empty() {
        return Err(FoodxError::validation("sku", "SKU is required"));
    }
    let available = state
        .factory
        .unit_of_work()
        .products()
        .is_sku_unique(&sku, params.exclude_id)
        .await?;
    Ok(Json(SkuAvailability { sku, available }))
}

pub(crate) async fn load_product<U: UnitOfWork>(uow: &U, id: Uuid) -> FoodxResult<Product> {
    uow.products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| FoodxError::not_found(format!("Product {}", id)))
}

/// SKU must be free and the supplier, when given, must exist.
async fn check_references<U: UnitOfWork>(uow: &U, input: &ProductInput, exclude_id: Option<Uuid>) -> FoodxResult<()> {
    if let Some(sku) = input.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if !uow.products().is_sku_unique(sku, exclude_id).await? {
            return Err(FoodxError::conflict(format!("A product with SKU '{}' already exists", sku)));
        }
    }
    if let Some(supplier_id) = input.supplier_id {
        if uow.suppliers().get_by_id(supplier_id).await?.is_none() {
            return Err(FoodxError::validation(
                "supplier_id",
                format!("Supplier {} does not exist", supplier_id),
            ));
        }
    }
    Ok(())
}
