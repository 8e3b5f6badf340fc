//! Patient endpoints. Delete is ADMIN only.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, require_admin, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::models::{PageQuery, PageResponse, Patient, PatientRequest};
use crate::patients;

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(req): ApiJson<PatientRequest>,
) -> ApiResult<Patient> {
    let mut conn = ctx.core.open_db()?;
    ok("Patient created", patients::create_patient(&mut conn, req)?)
}

/// `GET /api/patients/{id}`
pub async fn get(State(ctx): State<ApiContext>, ApiPath(id): ApiPath<i64>) -> ApiResult<Patient> {
    let conn = ctx.core.open_db()?;
    ok("Patient found", patients::get_patient(&conn, id)?)
}

/// `PUT /api/patients/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<PatientRequest>,
) -> ApiResult<Patient> {
    let mut conn = ctx.core.open_db()?;
    ok("Patient updated", patients::update_patient(&mut conn, id, req)?)
}

/// `DELETE /api/patients/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    patients::delete_patient(&mut conn, id)?;
    done("Patient deleted")
}

/// `GET /api/patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<PageResponse<Patient>> {
    let page = query.validate()?;
    let conn = ctx.core.open_db()?;
    ok("Patients listed", patients::list_patients(&conn, &page)?)
}

#[derive(Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    pub keyword: String,
}

/// `GET /api/patients/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<KeywordQuery>,
) -> ApiResult<Vec<Patient>> {
    let conn = ctx.core.open_db()?;
    ok("Patients found", patients::search_patients(&conn, &query.keyword)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCardQuery {
    pub id_card: String,
}

/// `GET /api/patients/by-idcard`
pub async fn by_id_card(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<IdCardQuery>,
) -> ApiResult<Patient> {
    let conn = ctx.core.open_db()?;
    ok("Patient found", patients::get_patient_by_id_card(&conn, &query.id_card)?)
}
