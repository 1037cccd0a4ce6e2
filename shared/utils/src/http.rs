//! Axum plumbing shared by the HTTP services.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use prometheus::TextEncoder;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ErrorDetail, FoodxError};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const CORRELATION_ID_HEADERS: [&str; 2] = ["idempotency-key", "x-correlation-id"];

/// Tags the request with an id, reusing the caller's `x-request-id` when present.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = match request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(existing) => existing.to_string(),
        None => {
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                request.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            id
        }
    };

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri()
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Whether error responses carry full server-side messages.
#[derive(Debug, Clone, Copy)]
pub struct ErrorDetails {
    pub expose: bool,
}

/// Replaces the public error body with the detailed one when details are exposed.
pub async fn error_details_middleware(
    State(details): State<ErrorDetails>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ErrorDetail>() {
        Some(ErrorDetail(body)) if details.expose => {
            let status = response.status();
            let headers = response.headers().clone();
            let mut detailed = (status, Json(body)).into_response();
            for (name, value) in headers.iter() {
                if name != axum::http::header::CONTENT_LENGTH {
                    detailed.headers_mut().insert(name.clone(), value.clone());
                }
            }
            detailed
        }
        _ => response,
    }
}

/// Caller identity from `x-user-id`, `system` when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = FoodxError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("system");
        Ok(CallerId(user.to_string()))
    }
}

/// Optional idempotency key from `idempotency-key` or `x-correlation-id`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrelationId(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = FoodxError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = CORRELATION_ID_HEADERS.iter().find_map(|name| {
            parts
                .headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        });
        if let Some(key) = &key {
            if key.len() > 100 {
                return Err(FoodxError::validation("correlation_id", "Correlation id must not exceed 100 characters"));
            }
        }
        Ok(CorrelationId(key))
    }
}

/// Prometheus text exposition of the default registry.
pub async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|_| "Error encoding metrics".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    async fn failing() -> Result<String, FoodxError> {
        Err(FoodxError::database("relation \"rfqs\" does not exist"))
    }

    async fn whoami(caller: CallerId, correlation: CorrelationId) -> String {
        format!("{}|{}", caller.as_str(), correlation.0.unwrap_or_default())
    }

    fn app(expose: bool) -> Router {
        Router::new()
            .route("/fail", get(failing))
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn_with_state(
                ErrorDetails { expose },
                error_details_middleware,
            ))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_server_errors_are_generic_unless_exposed() {
        let response = app(false)
            .oneshot(HttpRequest::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let body = body_json(response).await;
        assert_eq!(body["message"], crate::error::GENERIC_ERROR_MESSAGE);

        let response = app(true)
            .oneshot(HttpRequest::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("does not exist"));
        assert_eq!(body["statusCode"], 500);
    }

    #[tokio::test]
    async fn test_caller_and_correlation_headers() {
        let response = app(false)
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(USER_ID_HEADER, "buyer-7")
                    .header("Idempotency-Key", "req-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"buyer-7|req-1");

        let response = app(false)
            .oneshot(HttpRequest::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"system|");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = app(false)
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(REQUEST_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
    }
}
