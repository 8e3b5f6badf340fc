//! Service-layer error taxonomy, shared by every domain module.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::models::FieldErrors;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed: {}", .0.fields().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConstraintViolation(detail) => {
                tracing::debug!(%detail, "constraint violation");
                Self::Conflict(conflict_message(&detail))
            }
            DatabaseError::InvalidSortField(field) => {
                Self::field("sortBy", format!("cannot sort by '{field}'"))
            }
            DatabaseError::NotFound { entity_type, id } => Self::NotFound {
                entity: entity_type,
                id,
            },
            other => Self::Database(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from_write(err).into()
    }
}

fn conflict_message(detail: &str) -> String {
    if detail.contains("FOREIGN KEY") {
        "Record is still referenced by other records".to_string()
    } else if detail.contains("UNIQUE") {
        "Record conflicts with an existing record".to_string()
    } else {
        "Record violates a data constraint".to_string()
    }
}
