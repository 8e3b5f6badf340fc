//! Medicine endpoints. Catalogue writes are ADMIN only; stock updates are open to staff.

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::types::{done, ok, require_admin, ApiContext, ApiResult};
use crate::auth::AuthUser;
use crate::medicines::{self, DEFAULT_LOW_STOCK_THRESHOLD};
use crate::models::{CatalogueImport, Medicine, MedicineRequest, PageQuery, PageResponse};

/// `POST /api/medicines`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<MedicineRequest>,
) -> ApiResult<Medicine> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok("Medicine created", medicines::create_medicine(&mut conn, req)?)
}

/// `GET /api/medicines/{id}`
pub async fn get(State(ctx): State<ApiContext>, ApiPath(id): ApiPath<i64>) -> ApiResult<Medicine> {
    let conn = ctx.core.open_db()?;
    ok("Medicine found", medicines::get_medicine(&conn, id)?)
}

/// `PUT /api/medicines/{id}`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<MedicineRequest>,
) -> ApiResult<Medicine> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok("Medicine updated", medicines::update_medicine(&mut conn, id, req)?)
}

/// `DELETE /api/medicines/{id}`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    medicines::delete_medicine(&mut conn, id)?;
    done("Medicine deleted")
}

/// Paging fields are spelled out: `serde(flatten)` loses numeric parsing
/// in urlencoded queries.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub category: Option<String>,
}

impl MedicineListQuery {
    fn paging(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            size: self.size,
            sort_by: self.sort_by.clone(),
            sort_dir: self.sort_dir.clone(),
        }
    }
}

/// `GET /api/medicines`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<MedicineListQuery>,
) -> ApiResult<PageResponse<Medicine>> {
    let page = query.paging().validate()?;
    let conn = ctx.core.open_db()?;
    ok(
        "Medicines listed",
        medicines::list_medicines(&conn, &page, query.category.as_deref())?,
    )
}

#[derive(Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

/// `GET /api/medicines/search`
pub async fn search(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<NameQuery>,
) -> ApiResult<Vec<Medicine>> {
    let conn = ctx.core.open_db()?;
    ok("Medicines found", medicines::search_medicines(&conn, &query.name)?)
}

#[derive(Deserialize)]
pub struct CodeQuery {
    pub code: String,
}

/// `GET /api/medicines/by-code`
pub async fn by_code(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<CodeQuery>,
) -> ApiResult<Medicine> {
    let conn = ctx.core.open_db()?;
    ok("Medicine found", medicines::get_medicine_by_code(&conn, &query.code)?)
}

#[derive(Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<i64>,
}

/// `GET /api/medicines/low-stock`: available items at or below `threshold` (default 10).
pub async fn low_stock(
    State(ctx): State<ApiContext>,
    ApiQuery(query): ApiQuery<ThresholdQuery>,
) -> ApiResult<Vec<Medicine>> {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let conn = ctx.core.open_db()?;
    ok("Low stock medicines", medicines::low_stock_medicines(&conn, threshold)?)
}

#[derive(Deserialize)]
pub struct QuantityQuery {
    pub quantity: i64,
}

/// `PUT /api/medicines/{id}/stock`
pub async fn update_stock(
    State(ctx): State<ApiContext>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<QuantityQuery>,
) -> ApiResult<Medicine> {
    let mut conn = ctx.core.open_db()?;
    ok("Stock updated", medicines::update_stock(&mut conn, id, query.quantity)?)
}

/// `POST /api/medicines/init-common-medicines`: adds catalogue entries whose codes are missing.
pub async fn init_common(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<CatalogueImport> {
    require_admin(&caller)?;
    let mut conn = ctx.core.open_db()?;
    ok(
        "Common medicines initialized",
        medicines::init_common_medicines(&mut conn)?,
    )
}
