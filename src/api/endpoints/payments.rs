//! Payment endpoints. Delete and revenue reports are ADMIN only.

use axum::extract::State;
use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, parse_status, require_admin, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::db;
use crate::models::{
    PageQuery, PageResponse, PaymentDayStats, PaymentDetail, PaymentRequest, RevenueReport,
};
use crate::payments;

/// `POST /api/payments`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<PaymentDetail> {
    let mut conn = ctx.core.open_db()?;
    ok(
        "Payment created",
        payments::create_payment(&mut conn, req, Some(caller.id))?,
    )
}

/// `GET /api/payments/{id}`
pub async fn get(State(ctx): State<ApiContext>, ApiPath(id): ApiPath<i64>) -> ApiResult<PaymentDetail> {
    let conn = ctx.core.open_db()?;
    ok("Payment found", payments::get_payment(&conn, id)?)
}

/// `PUT /api/payments/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<PaymentRequest>,
) -> ApiResult<PaymentDetail> {
    let mut conn = ctx.core.open_db()?;
    ok("Payment updated", payments::update_payment(&mut conn, id, req)?)
}

/// `DELETE /api/payments/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    payments::delete_payment(&mut conn, id)?;
    done("Payment deleted")
}

/// `GET /api/payments`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<PageResponse<PaymentDetail>> {
    let page = query.validate()?;
    let conn = ctx.core.open_db()?;
    ok("Payments listed", payments::list_payments(&conn, &page)?)
}

/// `GET /api/payments/patient/{id}`
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Vec<PaymentDetail>> {
    let conn = ctx.core.open_db()?;
    ok("Payments listed", payments::payments_by_patient(&conn, patient_id)?)
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// `PUT /api/payments/{id}/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<PaymentDetail> {
    let status = parse_status("status", &query.status)?;
    let mut conn = ctx.core.open_db()?;
    ok(
        "Payment status updated",
        payments::update_payment_status(&mut conn, id, status)?,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayQuery {
    pub transaction_id: Option<String>,
}

/// `PUT /api/payments/{id}/pay`: refused once refunded.
pub async fn pay(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<PayQuery>,
) -> ApiResult<PaymentDetail> {
    let mut conn = ctx.core.open_db()?;
    ok(
        "Payment processed",
        payments::process_payment(&mut conn, id, query.transaction_id.as_deref())?,
    )
}

/// `PUT /api/payments/{id}/refund`: PAID only.
pub async fn refund(State(ctx): State<ApiContext>, ApiPath(id): ApiPath<i64>) -> ApiResult<PaymentDetail> {
    let mut conn = ctx.core.open_db()?;
    ok("Payment refunded", payments::process_refund(&mut conn, id)?)
}

/// `GET /api/payments/statistics/today`
pub async fn today_stats(State(ctx): State<ApiContext>) -> ApiResult<PaymentDayStats> {
    let conn = ctx.core.open_db()?;
    let today = db::local_now().date();
    ok(
        "Today's payment statistics",
        payments::payment_day_stats(&conn, today)?,
    )
}

/// `startTime` / `endTime` as `YYYY-MM-DDTHH:MM:SS`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueQuery {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// `GET /api/payments/revenue`: settled amounts by `paidAt`.
pub async fn revenue(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<RevenueQuery>,
) -> ApiResult<RevenueReport> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok(
        "Revenue report",
        payments::revenue_between(&conn, query.start_time, query.end_time)?,
    )
}
