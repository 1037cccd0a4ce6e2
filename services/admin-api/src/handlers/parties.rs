//! Supplier and buyer endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use foodx_database::{field, ProductQueries, Query as StoreQuery, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::{Buyer, BuyerInput, Order, Product, Supplier, SupplierInput};
use foodx_utils::{validate_model, FoodxError, FoodxResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::metrics::record_change;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PartyFilter {
    pub search: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl PartyFilter {
    fn query(&self) -> StoreQuery {
        let mut query = StoreQuery::new().order_by_asc("company_name");
        if !self.include_inactive {
            query = query.filter(field("is_active").eq(true));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(field("company_name").contains(term).or(field("email").contains(term)));
        }
        if let Some(country) = self.country.as_deref().filter(|c| !c.trim().is_empty()) {
            query = query.filter(field("country").eq(country));
        }
        query
    }
}

// ===== Suppliers =====

/// GET /api/v1/suppliers
pub async fn list_suppliers<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(filter): Query<PartyFilter>,
) -> FoodxResult<Json<Vec<Supplier>>> {
    let suppliers = state.factory.unit_of_work().suppliers().query(filter.query()).await?;
    Ok(Json(suppliers))
}

/// GET /api/v1/suppliers/:id
pub async fn get_supplier<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Supplier>> {
    let uow = state.factory.unit_of_work();
    Ok(Json(load_supplier(&uow, id).await?))
}

/// POST /api/v1/suppliers
///
/// A second supplier with the same email is a conflict (409).
pub async fn create_supplier<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Json(input): Json<SupplierInput>,
) -> FoodxResult<(StatusCode, Json<Supplier>)> {
    validate_model(&input)?;
    let supplier = state
        .factory
        .unit_of_work()
        .suppliers()
        .add(Supplier::new(input, Utc::now()))
        .await?;

    record_change("supplier", "created");
    info!(supplier_id = %supplier.id, company = %supplier.company_name, "Supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// PUT /api/v1/suppliers/:id
pub async fn update_supplier<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> FoodxResult<Json<Supplier>> {
    validate_model(&input)?;
    let uow = state.factory.unit_of_work();
    let mut supplier = load_supplier(&uow, id).await?;
    supplier.apply(input, Utc::now());
    Ok(Json(uow.suppliers().update(supplier).await?))
}

/// PUT /api/v1/suppliers/:id/verify
pub async fn verify_supplier<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Supplier>> {
    let uow = state.factory.unit_of_work();
    let mut supplier = load_supplier(&uow, id).await?;
    supplier.is_verified = true;
    supplier.updated_at = Some(Utc::now());
    let supplier = uow.suppliers().update(supplier).await?;

    record_change("supplier", "verified");
    info!(supplier_id = %supplier.id, "Supplier verified");
    Ok(Json(supplier))
}

/// DELETE /api/v1/suppliers/:id
///
/// Products and orders of the supplier stay, with the supplier reference cleared.
pub async fn delete_supplier<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<StatusCode> {
    if !state.factory.unit_of_work().suppliers().delete(id).await? {
        return Err(FoodxError::not_found(format!("Supplier {}", id)));
    }
    record_change("supplier", "deleted");
    info!(supplier_id = %id, "Supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/suppliers/:id/products
pub async fn supplier_products<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Vec<Product>>> {
    let uow = state.factory.unit_of_work();
    load_supplier(&uow, id).await?;
    Ok(Json(uow.products().by_supplier(id).await?))
}

// ===== Buyers =====

/// GET /api/v1/buyers
pub async fn list_buyers<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(filter): Query<PartyFilter>,
) -> FoodxResult<Json<Vec<Buyer>>> {
    let buyers = state.factory.unit_of_work().buyers().query(filter.query()).await?;
    Ok(Json(buyers))
}

/// GET /api/v1/buyers/:id
pub async fn get_buyer<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Buyer>> {
    let uow = state.factory.unit_of_work();
    Ok(Json(load_buyer(&uow, id).await?))
}

/// POST /api/v1/buyers
pub async fn create_buyer<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Json(input): Json<BuyerInput>,
) -> FoodxResult<(StatusCode, Json<Buyer>)> {
    validate_model(&input)?;
    let buyer = state
        .factory
        .unit_of_work()
        .buyers()
        .add(Buyer::new(input, Utc::now()))
        .await?;

    record_change("buyer", "created");
    info!(buyer_id = %buyer.id, company = %buyer.company_name, "Buyer created");
    Ok((StatusCode::CREATED, Json(buyer)))
}

/// PUT /api/v1/buyers/:id
pub async fn update_buyer<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    Json(input): Json<BuyerInput>,
) -> FoodxResult<Json<Buyer>> {
    validate_model(&input)?;
    let uow = state.factory.unit_of_work();
    let mut buyer = load_buyer(&uow, id).await?;
    buyer.apply(input, Utc::now());
    Ok(Json(uow.buyers().update(buyer).await?))
}

/// DELETE /api/v1/buyers/:id
///
/// Buyers with orders cannot be deleted (409).
pub async fn delete_buyer<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<StatusCode> {
    if !state.factory.unit_of_work().buyers().delete(id).await? {
        return Err(FoodxError::not_found(format!("Buyer {}", id)));
    }
    record_change("buyer", "deleted");
    info!(buyer_id = %id, "Buyer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/buyers/:id/orders
pub async fn buyer_orders<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Vec<Order>>> {
    let uow = state.factory.unit_of_work();
    load_buyer(&uow, id).await?;
    let orders = uow
        .orders()
        .query(
            StoreQuery::new()
                .filter(field("buyer_id").eq(id))
                .order_by_desc("order_date"),
        )
        .await?;
    Ok(Json(orders))
}

pub(crate) async fn load_supplier<U: UnitOfWork>(uow: &U, id: Uuid) -> FoodxResult<Supplier> {
    uow.suppliers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| FoodxError::not_found(format!("Supplier {}", id)))
}

pub(crate) async fn load_buyer<U: UnitOfWork>(uow: &U, id: Uuid) -> FoodxResult<Buyer> {
    uow.buyers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| FoodxError::not_found(format!("Buyer {}", id)))
}
