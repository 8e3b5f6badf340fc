//! Access logging middleware.
//!
//! Logs every API request with method, path, status, caller and latency.
//! Runs innermost on protected routes, after auth has injected `AuthUser`.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::AuthUser;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<AuthUser>()
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(%method, %path, status, %user, latency_ms, "API access");
    } else {
        tracing::info!(%method, %path, status, %user, latency_ms, "API access");
    }
    response
}
