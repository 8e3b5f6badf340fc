//! Health check endpoint.

use axum::extract::State;
use serde::Serialize;

use crate::api::types::{ok, ApiContext, ApiResult};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub name: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus a database reachability check.
pub async fn check(State(ctx): State<ApiContext>) -> ApiResult<HealthResponse> {
    let database = ctx.core.open_db().is_ok();
    ok(
        "OK",
        HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
            name: crate::config::APP_NAME,
            version: crate::config::APP_VERSION,
        },
    )
}
