use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use foodx_database::{CacheError, RepositoryError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

/// Message returned for server-side failures outside development.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum FoodxError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation {
        field: String,
        message: String,
        /// Messages per field, when the input failed several rules
        #[serde(default)]
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Email delivery error: {message}")]
    EmailDelivery { message: String },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl FoodxError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            errors: BTreeMap::new(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn email_delivery(message: impl Into<String>) -> Self {
        Self::EmailDelivery {
            message: message.into(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::EmailDelivery { .. } => "EMAIL_DELIVERY_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::EmailDelivery { .. } | Self::ExternalService { .. } => 502,
            Self::Database { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.http_status_code() >= 500
    }

    fn reason(&self) -> &'static str {
        match self.http_status_code() {
            400 => "Bad Request",
            401 => "Unauthorized",
            404 => "Not Found",
            409 => "Conflict",
            502 => "Bad Gateway",
            _ => "Internal Server Error",
        }
    }
}

pub type FoodxResult<T> = Result<T, FoodxError>;

/// JSON error body returned by every service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    /// Full body, including messages of server-side failures.
    pub fn detailed(error: &FoodxError) -> Self {
        let details = match error {
            FoodxError::Validation { errors, .. } if !errors.is_empty() => serde_json::to_value(errors).ok(),
            _ => None,
        };
        Self {
            status_code: error.http_status_code(),
            error: error.reason().to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details,
            timestamp: Utc::now(),
        }
    }

    /// Body safe to show to clients: server-side failures get a generic message.
    pub fn public(error: &FoodxError) -> Self {
        let mut response = Self::detailed(error);
        if error.is_server_error() {
            response.message = GENERIC_ERROR_MESSAGE.to_string();
            response.details = None;
        }
        response
    }
}

impl From<FoodxError> for ErrorResponse {
    fn from(error: FoodxError) -> Self {
        Self::public(&error)
    }
}

/// Detailed body attached to error responses; `crate::http::error_details_middleware`
/// swaps it in when details are exposed.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub ErrorResponse);

impl IntoResponse for FoodxError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "Request rejected");
        }

        let mut response = (status, Json(ErrorResponse::public(&self))).into_response();
        response
            .extensions_mut()
            .insert(ErrorDetail(ErrorResponse::detailed(&self)));
        response
    }
}

impl From<RepositoryError> for FoodxError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::UniqueViolation { table, constraint } => {
                Self::conflict(format!("A {} record with the same value already exists ({})", table, constraint))
            }
            RepositoryError::ForeignKeyViolation { table, constraint } => {
                Self::conflict(format!("The {} record is still referenced or references a missing record ({})", table, constraint))
            }
            RepositoryError::NotFound { table, id } => Self::not_found(format!("{} {}", table, id)),
            RepositoryError::UnknownField { field, .. } => {
                Self::validation(field.clone(), format!("Unknown field '{}'", field))
            }
            other => Self::database(other.to_string()),
        }
    }
}

impl From<CacheError> for FoodxError {
    fn from(error: CacheError) -> Self {
        Self::database(error.to_string())
    }
}

impl From<sqlx::Error> for FoodxError {
    fn from(error: sqlx::Error) -> Self {
        RepositoryError::from_sqlx("unknown", error).into()
    }
}

impl From<redis::RedisError> for FoodxError {
    fn from(error: redis::RedisError) -> Self {
        Self::database(error.to_string())
    }
}

impl From<reqwest::Error> for FoodxError {
    fn from(error: reqwest::Error) -> Self {
        Self::external_service("HTTP Client", error.to_string())
    }
}

impl From<serde_json::Error> for FoodxError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<ValidationErrors> for FoodxError {
    fn from(errors: ValidationErrors) -> Self {
        crate::validation::validation_error(&errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_repository_errors_map_to_http_statuses() {
        let conflict: FoodxError = RepositoryError::UniqueViolation {
            table: "products".into(),
            constraint: "products_sku_key".into(),
        }
        .into();
        assert_eq!(conflict.http_status_code(), 409);

        let missing: FoodxError = RepositoryError::not_found("rfqs", Uuid::nil()).into();
        assert_eq!(missing.http_status_code(), 404);

        let policy: FoodxError = RepositoryError::TransactionAlreadyActive.into();
        assert_eq!(policy.http_status_code(), 500);
    }

    #[test]
    fn test_public_body_hides_server_details() {
        let error = FoodxError::database("connection refused on 10.0.0.5");
        let public = ErrorResponse::public(&error);
        assert_eq!(public.message, GENERIC_ERROR_MESSAGE);
        assert_eq!(public.status_code, 500);

        let detailed = ErrorResponse::detailed(&error);
        assert!(detailed.message.contains("10.0.0.5"));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let error = FoodxError::not_found("product_briefs 42");
        let body = ErrorResponse::public(&error);
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.error, "Not Found");
        assert!(body.message.contains("product_briefs 42"));
    }

    #[test]
    fn test_error_body_uses_status_code_key() {
        let body = serde_json::to_value(ErrorResponse::public(&FoodxError::conflict("dup"))).unwrap();
        assert_eq!(body["statusCode"], 409);
        assert_eq!(body["code"], "CONFLICT");
    }
}
