pub mod api;
pub mod auth;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod dashboard;
pub mod db;
pub mod doctors;
pub mod error;
pub mod feedback;
pub mod medicines;
pub mod models;
pub mod patients;
pub mod payments;
pub mod registrations;
pub mod seed;
pub mod users;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::{CoreError, CoreState};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Server(#[from] api::server::ServerError),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Read configuration, prepare the store and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let core = Arc::new(CoreState::initialize(&config)?);
    let server = api::start_server(core, config.addr).await?;
    tracing::info!(addr = %server.local_addr(), "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.stop().await;
    Ok(())
}
