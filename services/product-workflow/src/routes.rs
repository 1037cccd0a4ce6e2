use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use foodx_database::{Query as StoreQuery, Repository, UnitOfWork, UnitOfWorkFactory};
use foodx_models::{BriefStatus, NewProductBrief, ProductBrief, ProductBriefUpdate, Project, Rfq};
use foodx_utils::http::{CallerId, CorrelationId};
use foodx_utils::{FoodxError, FoodxResult};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::briefs::ProductBriefService;
use crate::workflow::{AutomaticWorkflowService, WorkflowOutcome, WorkflowView};

pub struct AppState<F: UnitOfWorkFactory> {
    pub factory: F,
    pub briefs: Arc<dyn ProductBriefService>,
    pub workflow: Arc<AutomaticWorkflowService<F>>,
}

impl<F: UnitOfWorkFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            briefs: self.briefs.clone(),
            workflow: self.workflow.clone(),
        }
    }
}

pub fn create_api_routes<F: UnitOfWorkFactory>() -> Router<AppState<F>> {
    Router::new()
        // Product briefs
        .route("/product-briefs", get(list_briefs::<F>).post(create_brief::<F>))
        .route(
            "/product-briefs/:id",
            get(get_brief::<F>).put(update_brief::<F>).delete(delete_brief::<F>),
        )
        .route(
            "/product-briefs/:id/workflow",
            get(get_workflow::<F>).post(process_workflow::<F>),
        )
        .route("/product-briefs/:id/rfq", post(create_rfq::<F>))
        // RFQs
        .route("/rfqs", get(list_rfqs::<F>))
        .route("/rfqs/:id", get(get_rfq::<F>))
        .route("/rfqs/:id/project", post(create_project::<F>))
        // Projects
        .route("/projects", get(list_projects::<F>))
        .route("/projects/:id", get(get_project::<F>))
        // Lookups
        .route("/lookups/categories", get(categories::<F>))
        .route("/lookups/countries", get(countries::<F>))
}

#[derive(Debug, Default, Deserialize)]
pub struct BriefFilter {
    pub status: Option<String>,
    pub created_by: Option<String>,
}

async fn list_briefs<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Query(filter): Query<BriefFilter>,
) -> FoodxResult<Json<Vec<ProductBrief>>> {
    let briefs = match (filter.status.as_deref(), filter.created_by.as_deref()) {
        (Some(status), _) => {
            let status = BriefStatus::from_str(status)
                .ok_or_else(|| FoodxError::validation("status", format!("Unknown status '{}'", status)))?;
            let mut briefs = state.briefs.by_status(status).await?;
            if let Some(user) = filter.created_by.as_deref() {
                briefs.retain(|b| b.created_by == user);
            }
            briefs
        }
        (None, Some(user)) => state.briefs.by_user(user).await?,
        (None, None) => state.briefs.list().await?,
    };
    Ok(Json(briefs))
}

/// 201 for a new brief, 200 when the correlation id replays an earlier one.
async fn create_brief<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    caller: CallerId,
    CorrelationId(correlation_id): CorrelationId,
    Json(input): Json<NewProductBrief>,
) -> FoodxResult<Response> {
    let outcome = state.briefs.create(input, caller.as_str(), correlation_id).await?;
    let status = if outcome.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(outcome)).into_response())
}

async fn get_brief<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<ProductBrief>> {
    state
        .briefs
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| FoodxError::not_found(format!("ProductBrief {}", id)))
}

async fn update_brief<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    caller: CallerId,
    Json(update): Json<ProductBriefUpdate>,
) -> FoodxResult<Json<ProductBrief>> {
    state
        .briefs
        .update(id, update, caller.as_str())
        .await?
        .map(Json)
        .ok_or_else(|| FoodxError::not_found(format!("ProductBrief {}", id)))
}

async fn delete_brief<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<StatusCode> {
    if state.briefs.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(FoodxError::not_found(format!("ProductBrief {}", id)))
    }
}

async fn get_workflow<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<WorkflowView>> {
    state
        .workflow
        .workflow_for_brief(id)
        .await?
        .map(Json)
        .ok_or_else(|| FoodxError::not_found(format!("ProductBrief {}", id)))
}

async fn process_workflow<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    caller: CallerId,
) -> FoodxResult<Json<WorkflowOutcome>> {
    Ok(Json(state.briefs.process_workflow(id, caller.as_str()).await?))
}

async fn create_rfq<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    caller: CallerId,
) -> FoodxResult<Json<Rfq>> {
    Ok(Json(state.workflow.create_rfq_from_brief(id, caller.as_str()).await?))
}

async fn list_rfqs<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> FoodxResult<Json<Vec<Rfq>>> {
    let rfqs = state
        .factory
        .unit_of_work()
        .rfqs()
        .query(StoreQuery::new().order_by_desc("issue_date"))
        .await?;
    Ok(Json(rfqs))
}

async fn get_rfq<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Rfq>> {
    state
        .factory
        .unit_of_work()
        .rfqs()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| FoodxError::not_found(format!("RFQ {}", id)))
}

async fn create_project<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
    caller: CallerId,
) -> FoodxResult<Json<Project>> {
    Ok(Json(state.workflow.create_project_from_rfq(id, caller.as_str()).await?))
}

async fn list_projects<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
) -> FoodxResult<Json<Vec<Project>>> {
    let projects = state
        .factory
        .unit_of_work()
        .projects()
        .query(StoreQuery::new().order_by_desc("created_at"))
        .await?;
    Ok(Json(projects))
}

async fn get_project<F: UnitOfWorkFactory>(
    State(state): State<AppState<F>>,
    Path(id): Path<Uuid>,
) -> FoodxResult<Json<Project>> {
    state
        .factory
        .unit_of_work()
        .projects()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| FoodxError::not_found(format!("Project {}", id)))
}

async fn categories<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> FoodxResult<Json<Vec<String>>> {
    Ok(Json(state.briefs.categories().await?))
}

async fn countries<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> FoodxResult<Json<Vec<String>>> {
    Ok(Json(state.briefs.countries().await?))
}

/// Liveness plus a store round trip.
pub async fn health_check<F: UnitOfWorkFactory>(State(state): State<AppState<F>>) -> Json<Value> {
    let store = match state.factory.unit_of_work().product_briefs().count(None).await {
        Ok(_) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    let healthy = store["status"] == "healthy";

    Json(json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "foodx-product-workflow",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": { "store": store }
    }))
}
