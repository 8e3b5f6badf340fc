//! User administration endpoints. All ADMIN only.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, require_admin, run_blocking, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::models::{PageQuery, PageResponse, ResetPasswordRequest, Role, User, UserRequest};
use crate::users;

/// `POST /api/users`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<User> {
    require_admin(&caller)?;
    let core = ctx.core.clone();
    let user = run_blocking(move || {
        let mut conn = core.open_db()?;
        Ok(users::create_user(&mut conn, req, core.password_iterations)?)
    })
    .await?;
    ok("User created", user)
}

/// `GET /api/users/{id}`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<User> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok("User found", users::get_user(&conn, id)?)
}

/// `PUT /api/users/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UserRequest>,
) -> ApiResult<User> {
    require_admin(&caller)?;
    let core = ctx.core.clone();
    let user = run_blocking(move || {
        let mut conn = core.open_db()?;
        Ok(users::update_user(&mut conn, id, req, core.password_iterations)?)
    })
    .await?;
    ok("User updated", user)
}

/// `DELETE /api/users/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    users::delete_user(&mut conn, id)?;
    done("User deleted")
}

/// `GET /api/users`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<PageResponse<User>> {
    require_admin(&caller)?;
    let page = query.validate()?;
    let conn = ctx.core.open_db()?;
    ok("Users listed", users::list_users(&conn, &page)?)
}

#[derive(Deserialize)]
pub struct RoleQuery {
    pub role: Role,
}

/// `GET /api/users/by-role`
pub async fn by_role(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> ApiResult<Vec<User>> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok("Users listed", users::users_by_role(&conn, query.role)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub real_name: String,
}

/// `GET /api/users/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<User>> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok("Users found", users::search_users(&conn, &query.real_name)?)
}

/// `PUT /api/users/{id}/toggle-status`
pub async fn toggle_status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<User> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok("User status toggled", users::toggle_user_status(&mut conn, id)?)
}

/// `PUT /api/users/{id}/reset-password`
pub async fn reset_password(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let core = ctx.core.clone();
    run_blocking(move || {
        let mut conn = core.open_db()?;
        Ok(users::reset_password(&mut conn, id, req, core.password_iterations)?)
    })
    .await?;
    done("Password reset")
}
