//! Shared types for the REST API layer.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::auth::AuthUser;
use crate::core_state::CoreState;
use crate::models::FieldErrors;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Response body shared by every endpoint, success or failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Successful envelope carrying `data`.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        message: message.into(),
        data: Some(data),
        errors: None,
    }))
}

/// Successful envelope with `data: null`.
pub fn done(message: impl Into<String>) -> ApiResult<()> {
    Ok(Json(Envelope {
        success: true,
        message: message.into(),
        data: None,
        errors: None,
    }))
}

/// Reject callers without the ADMIN role.
pub fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = user.id, role = %user.role, "Admin-only route refused");
        Err(ApiError::Forbidden)
    }
}

/// Run store work that hashes passwords on the blocking pool, off the
/// async workers.
pub async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

/// Parse an upper-case status name from a query or path segment.
/// Unknown names become a validation error on `field`.
pub fn parse_status<T: FromStr>(field: &str, raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| ApiError::Validation(FieldErrors::single(field, format!("invalid status: {}", raw.trim()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, Role};

    #[tokio::test]
    async fn blocking_work_returns_its_result() {
        let value = run_blocking(|| Ok(6 * 7)).await.unwrap();
        assert_eq!(value, 42);

        let err = run_blocking(|| -> Result<(), ApiError> { Err(ApiError::Forbidden) })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn panicking_blocking_work_is_internal_error() {
        let err = run_blocking(|| -> Result<(), ApiError> { panic!("hash worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn status_names_are_case_insensitive() {
        let status: PaymentStatus = parse_status("status", " paid ").unwrap();
        assert_eq!(status, PaymentStatus::Paid);
        assert!(matches!(
            parse_status::<PaymentStatus>("status", "settled"),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn staff_is_refused_admin_routes() {
        let staff = AuthUser { id: 2, username: "staff1".into(), role: Role::Staff };
        let admin = AuthUser { id: 1, username: "admin".into(), role: Role::Admin };
        assert!(matches!(require_admin(&staff), Err(ApiError::Forbidden)));
        assert!(require_admin(&admin).is_ok());
    }
}
