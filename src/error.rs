// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::provider::ProviderError;
use crate::services::{ExportError, ServiceError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError {
        message: String,
        details: Option<String>,
    },

    // 502 Bad Gateway (telemetry provider issues)
    BadGateway {
        message: String,
        details: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError { .. } => 500,
            ApiError::BadGateway { .. } => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::BadGateway { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ApiError::InternalServerError { details, .. } | ApiError::BadGateway { details, .. } => {
                details.as_deref()
            }
            _ => None,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway { .. } => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code(),
        });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }
        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>, details: Option<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            details,
        }
    }

    pub fn bad_gateway(message: impl Into<String>, details: Option<String>) -> Self {
        ApiError::BadGateway {
            message: message.into(),
            details,
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert layer errors to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) | DatabaseError::Sqlx(sqlx::Error::PoolClosed) => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database misconfigured: {}", err);
                ApiError::service_unavailable("Database not configured")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error, keep SQL out of the message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("DB error", Some(sqlx_err.to_string()))
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        tracing::warn!("Telemetry provider error: {}", err);
        let message = match err {
            ProviderError::Authentication { .. } => "Telemetry provider login failed",
            ProviderError::Timeout(_) => "Telemetry provider timed out",
            _ => "Telemetry provider request failed",
        };
        ApiError::bad_gateway(message, Some(err.to_string()))
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        if err.is_client_error() {
            ApiError::bad_request(err.to_string())
        } else {
            tracing::error!("Export error: {}", err);
            ApiError::internal_server_error("Export error", Some(err.to_string()))
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Provider(e) => e.into(),
            ServiceError::Database(e) => e.into(),
            ServiceError::Export(e) => e.into(),
            ServiceError::NotInFleet(_) => ApiError::bad_request(format!("{}. Telemetry not synced.", err)),
            ServiceError::UnknownUser(_) => ApiError::not_found("User not found"),
            ServiceError::InvalidInput(msg) => ApiError::bad_request(msg),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
