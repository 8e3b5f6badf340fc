use axum::extract::State;

use crate::api::types::{ok, ApiContext, ApiResult};
use crate::dashboard;
use crate::db;
use crate::models::{DashboardSummary, TimeSeries};

/// `GET /api/dashboard/stats`
pub async fn stats(State(ctx): State<ApiContext>) -> ApiResult<DashboardSummary> {
    let conn = ctx.core.open_db()?;
    ok("Dashboard statistics", dashboard::summary(&conn)?)
}

/// `GET /api/dashboard/time-series`: today's cumulative registrations and revenue at two-hour marks.
pub async fn time_series(State(ctx): State<ApiContext>) -> ApiResult<TimeSeries> {
    let conn = ctx.core.open_db()?;
    let today = db::local_now().date();
    ok("Time series", dashboard::today_time_series(&conn, today)?)
}
