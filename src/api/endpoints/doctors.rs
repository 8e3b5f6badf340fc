//! Doctor endpoints. Writes are ADMIN only.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, require_admin, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::doctors;
use crate::models::{Doctor, DoctorRequest, PageQuery, PageResponse};

/// `POST /api/doctors`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<DoctorRequest>,
) -> ApiResult<Doctor> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok("Doctor created", doctors::create_doctor(&mut conn, req)?)
}

/// `GET /api/doctors/{id}`
pub async fn get(State(ctx): State<ApiContext>, ApiPath(id): ApiPath<i64>) -> ApiResult<Doctor> {
    let conn = ctx.core.open_db()?;
    ok("Doctor found", doctors::get_doctor(&conn, id)?)
}

/// `PUT /api/doctors/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<DoctorRequest>,
) -> ApiResult<Doctor> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok("Doctor updated", doctors::update_doctor(&mut conn, id, req)?)
}

/// `DELETE /api/doctors/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    doctors::delete_doctor(&mut conn, id)?;
    done("Doctor deleted")
}

/// `GET /api/doctors`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<PageResponse<Doctor>> {
    let page = query.validate()?;
    let conn = ctx.core.open_db()?;
    ok("Doctors listed", doctors::list_doctors(&conn, &page)?)
}

#[derive(Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

/// `GET /api/doctors/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<NameQuery>,
) -> ApiResult<Vec<Doctor>> {
    let conn = ctx.core.open_db()?;
    ok("Doctors found", doctors::search_doctors(&conn, &query.name)?)
}

#[derive(Deserialize)]
pub struct DepartmentQuery {
    pub department: String,
}

/// `GET /api/doctors/by-department`
pub async fn by_department(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> ApiResult<Vec<Doctor>> {
    let conn = ctx.core.open_db()?;
    ok(
        "Doctors listed",
        doctors::doctors_by_department(&conn, &query.department)?,
    )
}

/// `GET /api/doctors/departments`
pub async fn departments(State(ctx): State<ApiContext>) -> ApiResult<Vec<String>> {
    let conn = ctx.core.open_db()?;
    ok("Departments listed", doctors::departments(&conn)?)
}

/// `GET /api/doctors/available`
pub async fn available(State(ctx): State<ApiContext>) -> ApiResult<Vec<Doctor>> {
    let conn = ctx.core.open_db()?;
    ok("Available doctors", doctors::available_doctors(&conn)?)
}
