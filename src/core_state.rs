//! Shared application state handed to every request.
//!
//! Holds no mutable data: the store is the only shared state, and each
//! request opens its own connection to it.

use std::path::{Path, PathBuf};

use crate::config::{AppConfig, ConfigError};
use crate::crypto::{CryptoError, TokenSigner};
use crate::db;
use crate::seed;

pub struct CoreState {
    db_path: PathBuf,
    signer: TokenSigner,
    /// PBKDF2 rounds for newly hashed passwords.
    pub password_iterations: u32,
}

impl CoreState {
    pub fn new(db_path: PathBuf, signer: TokenSigner, password_iterations: u32) -> Self {
        Self {
            db_path,
            signer,
            password_iterations,
        }
    }

    /// Migrate the database, seed default accounts if enabled, build the signer.
    pub fn initialize(config: &AppConfig) -> Result<Self, CoreError> {
        let conn = db::open_database(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "Database ready");

        if config.seed_users {
            seed::seed_default_users(&conn, config.password_iterations)?;
        }

        let signer = match &config.token_secret {
            Some(secret) => TokenSigner::new(secret.as_bytes(), config.token_ttl_secs)?,
            None => {
                tracing::warn!(
                    "HOSPITAL_TOKEN_SECRET not set; using a random secret, tokens will not survive restarts"
                );
                TokenSigner::random(config.token_ttl_secs)
            }
        };

        Ok(Self::new(config.db_path.clone(), signer, config.password_iterations))
    }

    /// Open a connection to the (already migrated) database.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::connect(&self.db_path).map_err(CoreError::Database)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Token signer error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Seeding failed: {0}")]
    Seed(#[from] crate::error::ServiceError),
}
