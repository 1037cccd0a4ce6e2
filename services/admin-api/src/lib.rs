//! FoodX admin back-office API: catalog, trading parties, orders, dashboard and invitations.

pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use foodx_database::{PostgresPool, RedisPool, UnitOfWorkFactory};
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

use crate::middleware::maintenance_middleware;

/// Connections probed by the detailed health check; absent ones are reported as skipped.
#[derive(Clone, Default)]
pub struct HealthProbes {
    pub postgres: Option<PostgresPool>,
    pub redis: Option<RedisPool>,
}

pub struct AppState<F: UnitOfWorkFactory> {
    pub factory: F,
    pub mail: Arc<TransactionalEmailService>,
    pub config: Arc<AppConfig>,
    pub probes: HealthProbes,
}

impl<F: UnitOfWorkFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            mail: self.mail.clone(),
            config: self.config.clone(),
            probes: self.probes.clone(),
        }
    }
}

impl<F: UnitOfWorkFactory> AppState<F> {
    pub fn new(factory: F, mail: Arc<TransactionalEmailService>, config: AppConfig, probes: HealthProbes) -> Self {
        Self {
            factory,
            mail,
            config: Arc::new(config),
            probes,
        }
    }
}

pub fn create_app<F: UnitOfWorkFactory>(state: AppState<F>) -> Router {
    let config = state.config.clone();

    let api = routes::create_api_routes::<F>().layer(axum::middleware::from_fn_with_state(
        config.features.clone(),
        maintenance_middleware,
    ));

    Router::new()
        // Health check endpoint
        .route("/health", get(handlers::health::health_check))
        .route("/health/detailed", get(handlers::health::detailed_health_check::<F>))
        .route("/metrics", get(metrics_handler))
        // API routes
        .nest("/api/v1", api)
        // Middleware stack
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
        // Application state
        .with_state(state)
}
