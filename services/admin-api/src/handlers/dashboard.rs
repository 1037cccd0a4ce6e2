//! Dashboard summary counts for the back-office landing page.

use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use foodx_database::{field, Predicate, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::{BriefStatus, OrderStatus, ProjectStatus, RfqStatus};
use foodx_utils::FoodxResult;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub total_products: i64,
    pub active_products: i64,
    pub total_suppliers: i64,
    pub verified_suppliers: i64,
    pub total_buyers: i64,
    pub total_orders: i64,
    pub open_orders: i64,
    pub order_value: f64,
    pub active_briefs: i64,
    pub open_rfqs: i64,
    pub active_projects: i64,
    pub last_updated: DateTime<Utc>,
}

/// GET /api/v1/dashboard/summary
pub async fn get_dashboard_summary<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
) -> FoodxResult<Json<DashboardSummary>> {
    let uow = state.factory.unit_of_work();

    let open_statuses = [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Shipped];
    let open_orders = field("status").is_in(open_statuses.iter().map(|s| s.as_str()));
    let order_value = uow
        .orders()
        .find(field("status").ne(OrderStatus::Cancelled.as_str()))
        .await?
        .iter()
        .map(|order| order.total_amount)
        .sum::<f64>();

    let summary = DashboardSummary {
        total_products: uow.products().count(None).await?,
        active_products: uow.products().count(Some(field("is_active").eq(true))).await?,
        total_suppliers: uow.suppliers().count(None).await?,
        verified_suppliers: uow.suppliers().count(Some(field("is_verified").eq(true))).await?,
        total_buyers: uow.buyers().count(None).await?,
        total_orders: uow.orders().count(None).await?,
        open_orders: uow.orders().count(Some(open_orders)).await?,
        order_value: (order_value * 100.0).round() / 100.0,
        active_briefs: uow
            .product_briefs()
            .count(Some(Predicate::Or(vec![
                field("status").eq(BriefStatus::Active.as_str()),
                field("status").eq(BriefStatus::Sourcing.as_str()),
            ])))
            .await?,
        open_rfqs: uow
            .rfqs()
            .count(Some(field("status").eq(RfqStatus::Active.as_str())))
            .await?,
        active_projects: uow
            .projects()
            .count(Some(field("status").is_in([
                ProjectStatus::Planning.as_str(),
                ProjectStatus::InProgress.as_str(),
            ])))
            .await?,
        last_updated: Utc::now(),
    };

    Ok(Json(summary))
}
