//! Payments, settlement and refunds.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::{self, NewPayment, TimeWindow};
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

/// Record a new PENDING payment on behalf of `created_by`.
pub fn create_payment(
    conn: &mut Connection,
    req: PaymentRequest,
    created_by: Option<i64>,
) -> ServiceResult<PaymentDetail> {
    let input = req.validate_create()?;
    let tx = conn.transaction()?;
    let patient_id = input
        .patient_id
        .ok_or_else(|| ServiceError::field("patientId", "must not be null"))?;
    let new = NewPayment {
        patient_id: resolve_patient(&tx, patient_id)?,
        registration_id: resolve_registration(&tx, input.registration_id)?,
        medicine_id: resolve_medicine(&tx, input.medicine_id)?,
        fields: &input,
    };
    let id = db::insert_payment(&tx, &new, created_by, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(
        payment_id = id,
        patient_id,
        amount = %detail.payment.amount,
        created_by,
        "Payment created"
    );
    Ok(detail)
}

pub fn get_payment(conn: &Connection, id: i64) -> ServiceResult<PaymentDetail> {
    load(conn, id)
}

/// Replace the editable fields. References change only when supplied;
/// status is never touched here.
pub fn update_payment(
    conn: &mut Connection,
    id: i64,
    req: PaymentRequest,
) -> ServiceResult<PaymentDetail> {
    let input = req.validate_update()?;
    let tx = conn.transaction()?;
    let existing = db::find_payment_by_id(&tx, id)?
        .ok_or_else(|| ServiceError::not_found("Payment", id))?;

    let patient_id = match input.patient_id {
        Some(pid) => resolve_patient(&tx, pid)?,
        None => existing.patient_id,
    };
    let registration_id = match input.registration_id {
        Some(_) => resolve_registration(&tx, input.registration_id)?,
        None => existing.registration_id,
    };
    let medicine_id = match input.medicine_id {
        Some(_) => resolve_medicine(&tx, input.medicine_id)?,
        None => existing.medicine_id,
    };
    let new = NewPayment {
        patient_id,
        registration_id,
        medicine_id,
        fields: &input,
    };
    db::update_payment(&tx, id, &new, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(payment_id = id, "Payment updated");
    Ok(detail)
}

pub fn delete_payment(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_payment(&tx, id)?;
    tx.commit()?;
    tracing::info!(payment_id = id, "Payment deleted");
    Ok(())
}

pub fn list_payments(
    conn: &Connection,
    page: &PageRequest,
) -> ServiceResult<PageResponse<PaymentDetail>> {
    Ok(db::find_payment_page(conn, page)?)
}

pub fn payments_by_patient(conn: &Connection, patient_id: i64) -> ServiceResult<Vec<PaymentDetail>> {
    Ok(db::find_payments_by_patient(conn, patient_id)?)
}

/// Unguarded status overwrite.
pub fn update_payment_status(
    conn: &mut Connection,
    id: i64,
    status: PaymentStatus,
) -> ServiceResult<PaymentDetail> {
    let tx = conn.transaction()?;
    let before = load(&tx, id)?;
    db::set_payment_status(&tx, id, status, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(
        payment_id = id,
        from = %before.payment.status,
        to = %status,
        "Payment status changed"
    );
    Ok(detail)
}

/// Settle a payment. Anything but a refunded payment may be (re)settled.
pub fn process_payment(
    conn: &mut Connection,
    id: i64,
    transaction_id: Option<&str>,
) -> ServiceResult<PaymentDetail> {
    let transaction_id = transaction_id.map(str::trim).filter(|t| !t.is_empty());
    let tx = conn.transaction()?;
    let existing = load(&tx, id)?;
    if existing.payment.status == PaymentStatus::Refunded {
        tracing::warn!(payment_id = id, "Payment rejected: already refunded");
        return Err(ServiceError::BusinessRule(
            "A refunded payment cannot be paid".into(),
        ));
    }
    db::mark_payment_paid(&tx, id, transaction_id, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(payment_id = id, "Payment settled");
    Ok(detail)
}

/// Refund a settled payment.
pub fn process_refund(conn: &mut Connection, id: i64) -> ServiceResult<PaymentDetail> {
    let tx = conn.transaction()?;
    let existing = load(&tx, id)?;
    if existing.payment.status != PaymentStatus::Paid {
        tracing::warn!(payment_id = id, status = %existing.payment.status, "Refund rejected");
        return Err(ServiceError::BusinessRule(
            "Only paid payments can be refunded".into(),
        ));
    }
    db::mark_payment_refunded(&tx, id, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(payment_id = id, amount = %detail.payment.amount, "Payment refunded");
    Ok(detail)
}

/// Per-status count and amount for payments created on `day`.
pub fn payment_day_stats(conn: &Connection, day: NaiveDate) -> ServiceResult<PaymentDayStats> {
    let statuses = db::payment_status_totals(conn, Some(TimeWindow::whole_day(day)))?;
    Ok(PaymentDayStats { date: day, statuses })
}

/// Sum of amounts settled (by `paidAt`) within `[start, end]`.
pub fn revenue_between(
    conn: &Connection,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> ServiceResult<RevenueReport> {
    if start > end {
        return Err(ServiceError::field("endTime", "must not be before startTime"));
    }
    let total_revenue = db::sum_amount_paid_in(conn, TimeWindow::new(start, end))?;
    Ok(RevenueReport {
        start_time: start,
        end_time: end,
        total_revenue,
    })
}

fn load(conn: &Connection, id: i64) -> ServiceResult<PaymentDetail> {
    db::find_payment_detail(conn, id)?.ok_or_else(|| ServiceError::not_found("Payment", id))
}

fn resolve_patient(conn: &Connection, id: i64) -> ServiceResult<i64> {
    db::find_patient_by_id(conn, id)?
        .map(|p| p.id)
        .ok_or_else(|| ServiceError::not_found("Patient", id))
}

fn resolve_registration(conn: &Connection, id: Option<i64>) -> ServiceResult<Option<i64>> {
    let Some(id) = id else { return Ok(None) };
    db::find_registration_by_id(conn, id)?
        .map(|r| Some(r.id))
        .ok_or_else(|| ServiceError::not_found("Registration", id))
}

fn resolve_medicine(conn: &Connection, id: Option<i64>) -> ServiceResult<Option<i64>> {
    let Some(id) = id else { return Ok(None) };
    db::find_medicine_by_id(conn, id)?
        .map(|m| Some(m.id))
        .ok_or_else(|| ServiceError::not_found("Medicine", id))
}
