use axum::{
    routing::{get, post, put},
    Router,
};
use foodx_database::UnitOfWorkFactory;

use crate::handlers::{dashboard::*, invitations::*, orders::*, parties::*, products::*};
use crate::AppState;

pub fn create_api_routes<F: UnitOfWorkFactory>() -> Router<AppState<F>> {
    Router::new()
        // Catalog
        .route("/products", get(list_products::<F>).post(create_product::<F>))
        .route("/products/categories", get(product_categories::<F>))
        .route("/products/sku-available", get(sku_available::<F>))
        .route(
            "/products/:id",
            get(get_product::<F>).put(update_product::<F>).delete(delete_product::<F>),
        )
        // Suppliers
        .route("/suppliers", get(list_suppliers::<F>).post(create_supplier::<F>))
        .route(
            "/suppliers/:id",
            get(get_supplier::<F>).put(update_supplier::<F>).delete(delete_supplier::<F>),
        )
        .route("/suppliers/:id/verify", put(verify_supplier::<F>))
        .route("/suppliers/:id/products", get(supplier_products::<F>))
        // Buyers
        .route("/buyers", get(list_buyers::<F>).post(create_buyer::<F>))
        .route(
            "/buyers/:id",
            get(get_buyer::<F>).put(update_buyer::<F>).delete(delete_buyer::<F>),
        )
        .route("/buyers/:id/orders", get(buyer_orders::<F>))
        // Orders
        .route("/orders", get(list_orders::<F>).post(create_order::<F>))
        .route("/orders/:id", get(get_order::<F>))
        .route("/orders/:id/status", put(update_order_status::<F>))
        // Back office
        .route("/dashboard/summary", get(get_dashboard_summary::<F>))
        .route("/invitations", post(send_invitation::<F>))
}
