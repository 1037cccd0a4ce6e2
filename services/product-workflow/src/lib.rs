//! FoodX product workflow service.
//!
//! Product briefs enter here. Creating one generates its RFQ and project in the same
//! transaction; the HTTP surface also exposes the generated records and the brief lookups.

pub mod briefs;
pub mod derive;
pub mod metrics;
pub mod numbering;
pub mod routes;
pub mod workflow;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use foodx_database::{CacheService, UnitOfWorkFactory};
use foodx_utils::http::{
    error_details_middleware, metrics_handler, request_id_middleware, ErrorDetails, REQUEST_ID_HEADER,
    USER_ID_HEADER,
};
use foodx_utils::AppConfig;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use briefs::{CachedProductBriefService, DefaultProductBriefService, ProductBriefService};
pub use derive::WorkflowSettings;
pub use routes::AppState;
pub use workflow::{AutomaticWorkflowService, WorkflowOutcome, WorkflowView};

/// Wires services over `factory` and `cache` into the router.
pub fn build_state<F: UnitOfWorkFactory>(
    factory: F,
    cache: Arc<dyn CacheService>,
    config: &AppConfig,
) -> AppState<F> {
    let workflow = Arc::new(AutomaticWorkflowService::new(
        factory.clone(),
        WorkflowSettings::from(&config.workflow),
    ));
    let store = Arc::new(DefaultProductBriefService::new(factory.clone(), workflow.clone()));
    let briefs: Arc<dyn ProductBriefService> = Arc::new(CachedProductBriefService::new(store, cache));

    AppState {
        factory,
        briefs,
        workflow,
    }
}

pub fn create_app<F: UnitOfWorkFactory>(state: AppState<F>, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(routes::health_check::<F>))
        .route("/metrics", get(metrics_handler))
        .nest("/api", routes::create_api_routes::<F>())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers([
                            header::CONTENT_TYPE,
                            header::AUTHORIZATION,
                            HeaderName::from_static(USER_ID_HEADER),
                            HeaderName::from_static(REQUEST_ID_HEADER),
                            HeaderName::from_static("idempotency-key"),
                        ])
                        .max_age(Duration::from_secs(3600)),
                )
                .layer(DefaultBodyLimit::max(config.server.max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn_with_state(
                    ErrorDetails {
                        expose: config.is_development(),
                    },
                    error_details_middleware,
                )),
        )
        .with_state(state)
}
