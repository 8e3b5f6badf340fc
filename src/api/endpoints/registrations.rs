//! Registration endpoints. Delete is ADMIN only.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, parse_status, require_admin, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::db;
use crate::models::{
    PageQuery, PageResponse, RegistrationDayStats, RegistrationDetail, RegistrationRequest,
};
use crate::registrations;

/// `POST /api/registrations`
pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(req): ApiJson<RegistrationRequest>,
) -> ApiResult<RegistrationDetail> {
    let mut conn = ctx.core.open_db()?;
    ok("Registration created", registrations::create_registration(&mut conn, req)?)
}

/// `GET /api/registrations/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<RegistrationDetail> {
    let conn = ctx.core.open_db()?;
    ok("Registration found", registrations::get_registration(&conn, id)?)
}

/// `PUT /api/registrations/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RegistrationRequest>,
) -> ApiResult<RegistrationDetail> {
    let mut conn = ctx.core.open_db()?;
    ok(
        "Registration updated",
        registrations::update_registration(&mut conn, id, req)?,
    )
}

/// `DELETE /api/registrations/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    registrations::delete_registration(&mut conn, id)?;
    done("Registration deleted")
}

/// `GET /api/registrations`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<PageResponse<RegistrationDetail>> {
    let page = query.validate()?;
    let conn = ctx.core.open_db()?;
    ok("Registrations listed", registrations::list_registrations(&conn, &page)?)
}

/// `GET /api/registrations/patient/{id}`
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Vec<RegistrationDetail>> {
    let conn = ctx.core.open_db()?;
    ok(
        "Registrations listed",
        registrations::registrations_by_patient(&conn, patient_id)?,
    )
}

/// `GET /api/registrations/doctor/{id}`
pub async fn by_doctor(
    State(ctx): State<ApiContext>,
    ApiPath(doctor_id): ApiPath<i64>,
) -> ApiResult<Vec<RegistrationDetail>> {
    let conn = ctx.core.open_db()?;
    ok(
        "Registrations listed",
        registrations::registrations_by_doctor(&conn, doctor_id)?,
    )
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

/// `PUT /api/registrations/{id}/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<RegistrationDetail> {
    let status = parse_status("status", &query.status)?;
    let mut conn = ctx.core.open_db()?;
    ok(
        "Registration status updated",
        registrations::update_registration_status(&mut conn, id, status)?,
    )
}

/// `GET /api/registrations/statistics/today`
pub async fn today_stats(State(ctx): State<ApiContext>) -> ApiResult<RegistrationDayStats> {
    let conn = ctx.core.open_db()?;
    let today = db::local_now().date();
    ok(
        "Today's registration statistics",
        registrations::registration_day_stats(&conn, today)?,
    )
}
