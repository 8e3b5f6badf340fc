//! Repository layer: entity-scoped database operations.
//!
//! Free functions over `&Connection`, one sub-module per table plus the
//! aggregate queries in `statistics`. All public functions are re-exported.

mod doctor;
mod feedback;
mod medicine;
mod patient;
mod payment;
mod registration;
mod statistics;
mod user;

use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use rusqlite::{Connection, OptionalExtension, Params, Row};
use rust_decimal::Decimal;

use super::DatabaseError;
use crate::models::{PageRequest, PageResponse};

pub use doctor::*;
pub use feedback::*;
pub use medicine::*;
pub use patient::*;
pub use payment::*;
pub use registration::*;
pub use statistics::*;
pub use user::*;

/// Stored timestamp layout. Fixed width, so string order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local wall-clock time at whole-second precision.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_ts(field: &str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: value.into(),
    })
}

pub(crate) fn parse_opt_ts(
    field: &str,
    value: Option<String>,
) -> Result<Option<NaiveDateTime>, DatabaseError> {
    value.map(|v| parse_ts(field, &v)).transpose()
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| DatabaseError::InvalidValue {
        field: field.into(),
        value: value.into(),
    })
}

/// Money is stored as integer cents so SQL sums stay exact.
pub fn to_cents(amount: Decimal) -> Result<i64, DatabaseError> {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    i64::try_from(rounded.mantissa()).map_err(|_| DatabaseError::InvalidValue {
        field: "amount".into(),
        value: amount.to_string(),
    })
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// `%value%` with LIKE wildcards escaped; pair with `ESCAPE '\'`.
pub(crate) fn contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// `alias.col1, alias.col2, ...` for joined selects.
pub(crate) fn select_list(alias: &str, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `ORDER BY ... LIMIT ... OFFSET ...` for a page. `sortable` maps API
/// field names to qualified columns; ties fall back to `id_column`.
pub(crate) fn page_clause(
    page: &PageRequest,
    sortable: &[(&str, &str)],
    id_column: &str,
) -> Result<String, DatabaseError> {
    let column = sortable
        .iter()
        .find(|(field, _)| *field == page.sort_by)
        .map(|(_, column)| *column)
        .ok_or_else(|| DatabaseError::InvalidSortField(page.sort_by.clone()))?;
    let dir = page.direction.as_sql();
    Ok(format!(
        " ORDER BY {column} {dir}, {id_column} {dir} LIMIT {} OFFSET {}",
        page.size,
        page.offset()
    ))
}

pub(crate) fn query_all<R, T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    read: impl FnMut(&Row<'_>) -> rusqlite::Result<R>,
    convert: impl Fn(R) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError>
where
    P: Params,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read)?;
    rows.map(|r| convert(r?)).collect()
}

pub(crate) fn query_one<R, T, P>(
    conn: &Connection,
    sql: &str,
    params: P,
    read: impl FnOnce(&Row<'_>) -> rusqlite::Result<R>,
    convert: impl Fn(R) -> Result<T, DatabaseError>,
) -> Result<Option<T>, DatabaseError>
where
    P: Params,
{
    conn.query_row(sql, params, read)
        .optional()?
        .map(convert)
        .transpose()
}

pub(crate) fn count<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<i64, DatabaseError> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

/// Run a page query and its matching count query.
pub(crate) fn fetch_page<R, T, P>(
    conn: &Connection,
    select_sql: &str,
    count_sql: &str,
    params: P,
    page: &PageRequest,
    sortable: &[(&str, &str)],
    id_column: &str,
    read: impl FnMut(&Row<'_>) -> rusqlite::Result<R>,
    convert: impl Fn(R) -> Result<T, DatabaseError>,
) -> Result<PageResponse<T>, DatabaseError>
where
    P: Params + Clone,
{
    let sql = format!("{select_sql}{}", page_clause(page, sortable, id_column)?);
    let content = query_all(conn, &sql, params.clone(), read, convert)?;
    let total = count(conn, count_sql, params)?;
    Ok(PageResponse::new(content, page, total))
}

pub(crate) fn ensure_changed(changed: usize, entity_type: &str, id: i64) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::not_found(entity_type, id));
    }
    Ok(())
}
