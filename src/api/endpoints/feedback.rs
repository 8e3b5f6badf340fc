//! Feedback endpoints. Anyone signed in may submit and read a single
//! entry; triage is ADMIN only.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, parse_status, require_admin, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::feedback;
use crate::models::{Feedback, FeedbackRequest, FeedbackStatistics, PageQuery, PageResponse};

/// `POST /api/feedbacks`
pub async fn create(
    State(ctx): State<ApiContext>,
    ApiJson(req): ApiJson<FeedbackRequest>,
) -> ApiResult<Feedback> {
    let mut conn = ctx.core.open_db()?;
    ok("Feedback submitted", feedback::create_feedback(&mut conn, req)?)
}

/// `GET /api/feedbacks/{id}`
pub async fn get(State(ctx): State<ApiContext>, ApiPath(id): ApiPath<i64>) -> ApiResult<Feedback> {
    let conn = ctx.core.open_db()?;
    ok("Feedback found", feedback::get_feedback(&conn, id)?)
}

/// `GET /api/feedbacks`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<PageResponse<Feedback>> {
    require_admin(&caller)?;
    let page = query.validate()?;
    let conn = ctx.core.open_db()?;
    ok("Feedback listed", feedback::list_feedback(&conn, &page)?)
}

/// `GET /api/feedbacks/status/{status}`
pub async fn by_status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(status): ApiPath<String>,
) -> ApiResult<Vec<Feedback>> {
    require_admin(&caller)?;
    let status = parse_status("status", &status)?;
    let conn = ctx.core.open_db()?;
    ok("Feedback listed", feedback::feedback_by_status(&conn, status)?)
}

/// `GET /api/feedbacks/type/{type}`
pub async fn by_type(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(feedback_type): ApiPath<String>,
) -> ApiResult<Vec<Feedback>> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok("Feedback listed", feedback::feedback_by_type(&conn, &feedback_type)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    #[serde(default)]
    pub contact_name: String,
}

/// `GET /api/feedbacks/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ContactQuery>,
) -> ApiResult<Vec<Feedback>> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok("Feedback found", feedback::search_feedback(&conn, &query.contact_name)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessQuery {
    pub processing_notes: Option<String>,
    pub processed_by_user_id: Option<i64>,
}

/// `PUT /api/feedbacks/{id}/process`: processor defaults to the caller.
pub async fn process(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ProcessQuery>,
) -> ApiResult<Feedback> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    let processed = feedback::process_feedback(
        &mut conn,
        id,
        query.processing_notes,
        query.processed_by_user_id,
        caller.id,
    )?;
    ok("Feedback processed", processed)
}

/// `PUT /api/feedbacks/{id}/close`
pub async fn close(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Feedback> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok("Feedback closed", feedback::close_feedback(&mut conn, id)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub status: String,
    pub resolution_notes: Option<String>,
}

/// `PUT /api/feedbacks/{id}/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<Feedback> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok(
        "Feedback status updated",
        feedback::update_feedback_status(&mut conn, id, &query.status, query.resolution_notes)?,
    )
}

/// `GET /api/feedbacks/statistics`
pub async fn statistics(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<FeedbackStatistics> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    ok("Feedback statistics", feedback::feedback_statistics(&conn)?)
}

/// `DELETE /api/feedbacks/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    feedback::delete_feedback(&mut conn, id)?;
    done("Feedback deleted")
}
