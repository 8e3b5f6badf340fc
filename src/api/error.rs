//! API error type rendered as the standard response envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::Envelope;
use crate::core_state::CoreError;
use crate::error::ServiceError;
use crate::models::FieldErrors;

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Access denied")]
    Forbidden,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BusinessRule(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Access denied: insufficient role".to_string(),
            ),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation failed".to_string()),
            ApiError::BadRequest(detail)
            | ApiError::NotFound(detail)
            | ApiError::Conflict(detail)
            | ApiError::BusinessRule(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::InvalidCredentials => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let errors = match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        };
        let body: Envelope<()> = Envelope {
            success: false,
            message,
            data: None,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => ApiError::Validation(errors),
            ServiceError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::BusinessRule(msg) => ApiError::BusinessRule(msg),
            ServiceError::InvalidCredentials => ApiError::InvalidCredentials,
            ServiceError::Database(e) => ApiError::Internal(e.to_string()),
            ServiceError::Crypto(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}
