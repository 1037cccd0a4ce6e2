//! FoodX email service.
//!
//! Stores every message it sends or receives, groups them into threads, and tracks delivery
//! through the provider's event webhook.

pub mod dto;
pub mod mailbox;
pub mod metrics;
pub mod receiving;
pub mod routes;
pub mod sending;
pub mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use foodx_database::UnitOfWorkFactory;
use foodx_mail::TransactionalEmailService;
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

pub use dto::{CleanupReport, EmailRequest, EmailResponse, EmailThreadResponse, InboxResponse, SendResult};
pub use routes::AppState;
pub use sending::EmailService;

pub fn build_state<F: UnitOfWorkFactory>(factory: F, mail: Arc<TransactionalEmailService>) -> AppState<F> {
    AppState {
        emails: Arc::new(EmailService::new(factory.clone(), mail)),
        factory,
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
