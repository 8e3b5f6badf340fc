pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Malformed password hash")]
    MalformedHash,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token lifetime out of range")]
    InvalidTtl,

    #[error("Token signing key rejected: {0}")]
    InvalidKey(String),

    #[error("Claims serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
