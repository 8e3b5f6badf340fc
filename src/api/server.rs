//! API server lifecycle: bind, spawn the axum server in a background task,
//! return a handle holding the shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Failed to get server address: {0}")]
    LocalAddr(std::io::Error),
}

/// Handle to a running API server.
pub struct ApiServer {
    local_addr: SocketAddr,
    started_at: chrono::DateTime<chrono::Utc>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    /// Signal graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Signal shutdown and wait for in-flight requests to drain.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {e}");
            }
        }
    }
}

/// Bind `addr`, build the full router and serve it in a background task.
pub async fn start_server(core: Arc<CoreState>, addr: SocketAddr) -> Result<ApiServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(addr = %local_addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        local_addr,
        started_at: chrono::Utc::now(),
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::config::AppConfig;

    fn test_core(dir: &std::path::Path) -> Arc<CoreState> {
        let config = AppConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            db_path: dir.join("hospital.db"),
            token_secret: None,
            token_ttl_secs: 60,
            password_iterations: 1_000,
            seed_users: false,
        };
        Arc::new(CoreState::initialize(&config).unwrap())
    }

    /// Minimal HTTP/1.1 GET over a raw socket; returns the status line.
    async fn get_status_line(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response.lines().next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let tmp = tempfile::tempdir().unwrap();
        let server = start_server(test_core(tmp.path()), "127.0.0.1:0".parse().unwrap())
            .await
            .expect("server should start");
        let addr = server.local_addr();
        assert!(addr.port() > 0);

        assert!(get_status_line(addr, "/api/health").await.contains("200"));
        assert!(get_status_line(addr, "/api/patients").await.contains("401"));
        assert!(get_status_line(addr, "/nonexistent").await.contains("404"));

        server.stop().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = start_server(test_core(tmp.path()), "127.0.0.1:0".parse().unwrap())
            .await
            .expect("server should start");
        server.shutdown();
        server.shutdown();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let core = test_core(tmp.path());
        let first = start_server(core.clone(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let err = start_server(core, first.local_addr()).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
        first.stop().await;
    }
}
