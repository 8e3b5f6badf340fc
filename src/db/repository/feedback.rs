use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::{
    contains_pattern, ensure_changed, fetch_page, fmt_ts, parse_opt_ts, parse_ts, query_all,
    query_one,
};
use crate::db::DatabaseError;
use crate::models::*;

/// Feedback columns plus the processor's real name.
const SELECT_FEEDBACK: &str = "SELECT f.id, f.contact_name, f.contact_phone, f.contact_email,
     f.feedback_type, f.content, f.processing_notes, f.status, f.created_at, f.processed_at,
     f.processed_by, u.real_name
     FROM feedbacks f LEFT JOIN users u ON u.id = f.processed_by";

const FEEDBACK_SORTABLE: &[(&str, &str)] = &[
    ("id", "f.id"),
    ("contactName", "f.contact_name"),
    ("feedbackType", "f.feedback_type"),
    ("status", "f.status"),
    ("createdAt", "f.created_at"),
    ("processedAt", "f.processed_at"),
];

pub fn insert_feedback(
    conn: &Connection,
    input: &FeedbackInput,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO feedbacks (contact_name, contact_phone, contact_email, feedback_type,
         content, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            input.contact_name,
            input.contact_phone,
            input.contact_email,
            input.feedback_type,
            input.content,
            FeedbackStatus::Pending.as_str(),
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

/// Mark processed with notes and processor.
pub fn mark_feedback_processed(
    conn: &Connection,
    id: i64,
    notes: Option<&str>,
    processed_by: Option<i64>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE feedbacks SET status = ?1, processing_notes = ?2, processed_by = ?3,
             processed_at = ?4
             WHERE id = ?5",
            params![
                FeedbackStatus::Processed.as_str(),
                notes,
                processed_by,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Feedback", id)
}

/// Set the status. `notes` and `processed_at` overwrite only when given.
pub fn set_feedback_status(
    conn: &Connection,
    id: i64,
    status: FeedbackStatus,
    notes: Option<&str>,
    processed_at: Option<NaiveDateTime>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE feedbacks SET status = ?1,
         processing_notes = COALESCE(?2, processing_notes),
         processed_at = COALESCE(?3, processed_at)
         WHERE id = ?4",
        params![status.as_str(), notes, processed_at.as_ref().map(fmt_ts), id],
    )?;
    ensure_changed(changed, "Feedback", id)
}

pub fn delete_feedback(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM feedbacks WHERE id = ?1", params![id])?;
    ensure_changed(changed, "Feedback", id)
}

pub fn find_feedback_by_id(conn: &Connection, id: i64) -> Result<Option<Feedback>, DatabaseError> {
    query_one(
        conn,
        &format!("{SELECT_FEEDBACK} WHERE f.id = ?1"),
        params![id],
        read_feedback,
        feedback_from_row,
    )
}

pub fn find_feedback_page(
    conn: &Connection,
    page: &PageRequest,
) -> Result<PageResponse<Feedback>, DatabaseError> {
    fetch_page(
        conn,
        SELECT_FEEDBACK,
        "SELECT COUNT(*) FROM feedbacks",
        params![],
        page,
        FEEDBACK_SORTABLE,
        "f.id",
        read_feedback,
        feedback_from_row,
    )
}

pub fn find_feedback_by_status(
    conn: &Connection,
    status: FeedbackStatus,
) -> Result<Vec<Feedback>, DatabaseError> {
    query_all(
        conn,
        &format!("{SELECT_FEEDBACK} WHERE f.status = ?1 ORDER BY f.created_at DESC, f.id DESC"),
        params![status.as_str()],
        read_feedback,
        feedback_from_row,
    )
}

pub fn find_feedback_by_type(
    conn: &Connection,
    feedback_type: &str,
) -> Result<Vec<Feedback>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{SELECT_FEEDBACK} WHERE f.feedback_type = ?1 ORDER BY f.created_at DESC, f.id DESC"
        ),
        params![feedback_type],
        read_feedback,
        feedback_from_row,
    )
}

pub fn search_feedback_by_contact_name(
    conn: &Connection,
    name: &str,
) -> Result<Vec<Feedback>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{SELECT_FEEDBACK} WHERE f.contact_name LIKE ?1 ESCAPE '\\'
             ORDER BY f.created_at DESC, f.id DESC"
        ),
        params![contains_pattern(name)],
        read_feedback,
        feedback_from_row,
    )
}

struct FeedbackRow {
    id: i64,
    contact_name: String,
    contact_phone: Option<String>,
    contact_email: Option<String>,
    feedback_type: String,
    content: String,
    processing_notes: Option<String>,
    status: String,
    created_at: String,
    processed_at: Option<String>,
    processed_by_id: Option<i64>,
    processed_by_name: Option<String>,
}

fn read_feedback(row: &Row<'_>) -> Result<FeedbackRow, rusqlite::Error> {
    Ok(FeedbackRow {
        id: row.get(0)?,
        contact_name: row.get(1)?,
        contact_phone: row.get(2)?,
        contact_email: row.get(3)?,
        feedback_type: row.get(4)?,
        content: row.get(5)?,
        processing_notes: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        processed_at: row.get(9)?,
        processed_by_id: row.get(10)?,
        processed_by_name: row.get(11)?,
    })
}

fn feedback_from_row(row: FeedbackRow) -> Result<Feedback, DatabaseError> {
    Ok(Feedback {
        id: row.id,
        contact_name: row.contact_name,
        contact_phone: row.contact_phone,
        contact_email: row.contact_email,
        feedback_type: row.feedback_type,
        content: row.content,
        processing_notes: row.processing_notes,
        status: FeedbackStatus::from_str(&row.status)?,
        created_at: parse_ts("created_at", &row.created_at)?,
        processed_at: parse_opt_ts("processed_at", row.processed_at)?,
        processed_by_id: row.processed_by_id,
        processed_by_name: row.processed_by_name,
    })
}
