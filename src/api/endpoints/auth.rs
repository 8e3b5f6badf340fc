//! Login and own-account endpoints.
//!
//! `POST /api/auth/login` and `GET /api/auth/check-username` are public;
//! `GET /api/auth/me` and `PUT /api/auth/password` need a token.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::types::{done, ok, run_blocking, ApiContext, ApiResult};
use crate::auth::{self, AuthUser, LoginResponse};
use crate::models::{ChangePasswordRequest, LoginRequest, User};
use crate::users;

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let core = ctx.core.clone();
    let response = run_blocking(move || {
        let conn = core.open_db()?;
        Ok(auth::login(
            &conn,
            core.signer(),
            &req.username,
            &req.password,
            core.password_iterations,
            chrono::Utc::now().timestamp(),
        )?)
    })
    .await?;
    ok("Login successful", response)
}

#[derive(Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

/// `GET /api/auth/check-username`: `true` when the name is still free.
pub async fn check_username(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<UsernameQuery>,
) -> ApiResult<bool> {
    let conn = ctx.core.open_db()?;
    let available = !users::username_taken(&conn, &query.username)?;
    ok("Username checked", available)
}

/// `GET /api/auth/me`
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<User> {
    let conn = ctx.core.open_db()?;
    ok("Current user", users::get_user(&conn, user.id)?)
}

/// `PUT /api/auth/password`
pub async fn change_password(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    let core = ctx.core.clone();
    run_blocking(move || {
        let mut conn = core.open_db()?;
        Ok(users::change_password(&mut conn, user.id, req, core.password_iterations)?)
    })
    .await?;
    done("Password changed")
}
