use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use foodx_utils::{ErrorResponse, FeatureFlags};

/// Answers every API request with 503 while maintenance mode is switched on.
pub async fn maintenance_middleware(State(features): State<FeatureFlags>, request: Request, next: Next) -> Response {
    if !features.enable_maintenance_mode {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "Rejected during maintenance");
    let body = ErrorResponse {
        status_code: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
        error: "Service Unavailable".to_string(),
        code: "MAINTENANCE".to_string(),
        message: features.maintenance_message.clone(),
        details: None,
        timestamp: Utc::now(),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}
