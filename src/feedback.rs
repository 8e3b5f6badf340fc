//! Patient and visitor feedback.

use rusqlite::Connection;

use crate::db::{self, TimeWindow};
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

/// Submit feedback. New feedback is always PENDING.
pub fn create_feedback(conn: &mut Connection, req: FeedbackRequest) -> ServiceResult<Feedback> {
    let input = req.validate()?;
    let tx = conn.transaction()?;
    let id = db::insert_feedback(&tx, &input, db::local_now())?;
    let feedback = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(feedback_id = id, feedback_type = %feedback.feedback_type, "Feedback submitted");
    Ok(feedback)
}

pub fn get_feedback(conn: &Connection, id: i64) -> ServiceResult<Feedback> {
    load(conn, id)
}

pub fn list_feedback(conn: &Connection, page: &PageRequest) -> ServiceResult<PageResponse<Feedback>> {
    Ok(db::find_feedback_page(conn, page)?)
}

pub fn feedback_by_status(conn: &Connection, status: FeedbackStatus) -> ServiceResult<Vec<Feedback>> {
    Ok(db::find_feedback_by_status(conn, status)?)
}

pub fn feedback_by_type(conn: &Connection, feedback_type: &str) -> ServiceResult<Vec<Feedback>> {
    Ok(db::find_feedback_by_type(conn, feedback_type.trim())?)
}

pub fn search_feedback(conn: &Connection, contact_name: &str) -> ServiceResult<Vec<Feedback>> {
    Ok(db::search_feedback_by_contact_name(conn, contact_name.trim())?)
}

/// Mark feedback PROCESSED. The processor defaults to `caller_id`; an id that
/// does not resolve to a user leaves the processor empty.
pub fn process_feedback(
    conn: &mut Connection,
    id: i64,
    notes: Option<String>,
    processed_by: Option<i64>,
    caller_id: i64,
) -> ServiceResult<Feedback> {
    let notes = validate_processing_notes(notes)?;
    let tx = conn.transaction()?;
    load(&tx, id)?;

    let processor_id = processed_by.unwrap_or(caller_id);
    let processor = db::find_user_by_id(&tx, processor_id)?.map(|u| u.id);
    if processor.is_none() {
        tracing::debug!(feedback_id = id, processor_id, "Processor not found, leaving empty");
    }
    db::mark_feedback_processed(&tx, id, notes.as_deref(), processor, db::local_now())?;
    let feedback = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(feedback_id = id, processed_by = processor, "Feedback processed");
    Ok(feedback)
}

pub fn close_feedback(conn: &mut Connection, id: i64) -> ServiceResult<Feedback> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::set_feedback_status(&tx, id, FeedbackStatus::Closed, None, None)?;
    let feedback = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(feedback_id = id, "Feedback closed");
    Ok(feedback)
}

/// Set a status given by name (any case). Notes are kept unless non-blank
/// ones are supplied; PROCESSED and CLOSED stamp the processing time.
pub fn update_feedback_status(
    conn: &mut Connection,
    id: i64,
    status: &str,
    notes: Option<String>,
) -> ServiceResult<Feedback> {
    let status = FeedbackStatus::parse_loose(status)
        .map_err(|_| ServiceError::field("status", format!("invalid status: {}", status.trim())))?;
    let notes = validate_processing_notes(notes)?;

    let tx = conn.transaction()?;
    load(&tx, id)?;
    let processed_at = matches!(status, FeedbackStatus::Processed | FeedbackStatus::Closed)
        .then(db::local_now);
    db::set_feedback_status(&tx, id, status, notes.as_deref(), processed_at)?;
    let feedback = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(feedback_id = id, status = %status, "Feedback status changed");
    Ok(feedback)
}

pub fn feedback_statistics(conn: &Connection) -> ServiceResult<FeedbackStatistics> {
    let today = TimeWindow::whole_day(db::local_now().date());
    Ok(FeedbackStatistics {
        status_stats: db::feedback_status_counts(conn)?,
        type_stats: db::feedback_type_counts(conn)?,
        total_count: db::count_feedback(conn)?,
        today_count: db::count_feedback_created_in(conn, today)?,
    })
}

pub fn delete_feedback(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_feedback(&tx, id)?;
    tx.commit()?;
    tracing::info!(feedback_id = id, "Feedback deleted");
    Ok(())
}

fn load(conn: &Connection, id: i64) -> ServiceResult<Feedback> {
    db::find_feedback_by_id(conn, id)?.ok_or_else(|| ServiceError::not_found("Feedback", id))
}
