use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::medicine::{medicine_from_row, read_medicine, MedicineRow, MEDICINE_FIELDS};
use super::patient::{patient_from_row, read_patient, PatientRow, PATIENT_FIELDS};
use super::registration::{
    read_registration, registration_from_row, RegistrationRow, REGISTRATION_FIELDS,
};
use super::{
    ensure_changed, fetch_page, fmt_ts, from_cents, parse_opt_ts, parse_ts, query_all, query_one,
    select_list, to_cents,
};
use crate::db::DatabaseError;
use crate::models::*;

const PAYMENT_FIELDS: &[&str] = &[
    "id",
    "patient_id",
    "registration_id",
    "medicine_id",
    "payment_type",
    "amount_cents",
    "status",
    "payment_method",
    "transaction_id",
    "quantity",
    "description",
    "notes",
    "paid_at",
    "refunded_at",
    "created_by",
    "created_at",
    "updated_at",
];

const PAYMENT_SORTABLE: &[(&str, &str)] = &[
    ("id", "pay.id"),
    ("amount", "pay.amount_cents"),
    ("status", "pay.status"),
    ("paymentType", "pay.payment_type"),
    ("paymentMethod", "pay.payment_method"),
    ("paidAt", "pay.paid_at"),
    ("createdAt", "pay.created_at"),
    ("updatedAt", "pay.updated_at"),
    ("patientName", "p.name"),
];

/// Payment, patient, then the optional registration and medicine columns.
fn select_details() -> String {
    format!(
        "SELECT {}, {}, {}, {} FROM payments pay
         JOIN patients p ON p.id = pay.patient_id
         LEFT JOIN registrations r ON r.id = pay.registration_id
         LEFT JOIN medicines m ON m.id = pay.medicine_id",
        select_list("pay", PAYMENT_FIELDS),
        select_list("p", PATIENT_FIELDS),
        select_list("r", REGISTRATION_FIELDS),
        select_list("m", MEDICINE_FIELDS),
    )
}

/// Fully resolved payment values, references included.
pub struct NewPayment<'a> {
    pub patient_id: i64,
    pub registration_id: Option<i64>,
    pub medicine_id: Option<i64>,
    pub fields: &'a PaymentInput,
}

pub fn insert_payment(
    conn: &Connection,
    payment: &NewPayment<'_>,
    created_by: Option<i64>,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    let f = payment.fields;
    conn.execute(
        "INSERT INTO payments (patient_id, registration_id, medicine_id, payment_type,
         amount_cents, status, payment_method, quantity, description, notes, created_by,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            payment.patient_id,
            payment.registration_id,
            payment.medicine_id,
            f.payment_type.as_str(),
            to_cents(f.amount)?,
            PaymentStatus::Pending.as_str(),
            f.payment_method,
            f.quantity,
            f.description,
            f.notes,
            created_by,
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the editable fields. Status and its timestamps are untouched.
pub fn update_payment(
    conn: &Connection,
    id: i64,
    payment: &NewPayment<'_>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let f = payment.fields;
    let changed = conn
        .execute(
            "UPDATE payments SET patient_id = ?1, registration_id = ?2, medicine_id = ?3,
             payment_type = ?4, amount_cents = ?5, payment_method = ?6, quantity = ?7,
             description = ?8, notes = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                payment.patient_id,
                payment.registration_id,
                payment.medicine_id,
                f.payment_type.as_str(),
                to_cents(f.amount)?,
                f.payment_method,
                f.quantity,
                f.description,
                f.notes,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Payment", id)
}

pub fn set_payment_status(
    conn: &Connection,
    id: i64,
    status: PaymentStatus,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE payments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_ts(&now), id],
    )?;
    ensure_changed(changed, "Payment", id)
}

pub fn mark_payment_paid(
    conn: &Connection,
    id: i64,
    transaction_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE payments SET status = ?1, transaction_id = ?2, paid_at = ?3, updated_at = ?3
         WHERE id = ?4",
        params![PaymentStatus::Paid.as_str(), transaction_id, fmt_ts(&now), id],
    )?;
    ensure_changed(changed, "Payment", id)
}

pub fn mark_payment_refunded(
    conn: &Connection,
    id: i64,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE payments SET status = ?1, refunded_at = ?2, updated_at = ?2 WHERE id = ?3",
        params![PaymentStatus::Refunded.as_str(), fmt_ts(&now), id],
    )?;
    ensure_changed(changed, "Payment", id)
}

pub fn delete_payment(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM payments WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Payment", id)
}

pub fn find_payment_by_id(conn: &Connection, id: i64) -> Result<Option<Payment>, DatabaseError> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payments pay WHERE pay.id = ?1",
            select_list("pay", PAYMENT_FIELDS)
        ),
        params![id],
        |row| read_payment(row, 0),
        payment_from_row,
    )
}

pub fn find_payment_detail(
    conn: &Connection,
    id: i64,
) -> Result<Option<PaymentDetail>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE pay.id = ?1", select_details()),
        params![id],
        read_detail,
        detail_from_row,
    )
}

pub fn find_payment_page(
    conn: &Connection,
    page: &PageRequest,
) -> Result<PageResponse<PaymentDetail>, DatabaseError> {
    fetch_page(
        conn,
        &select_details(),
        "SELECT COUNT(*) FROM payments",
        params![],
        page,
        PAYMENT_SORTABLE,
        "pay.id",
        read_detail,
        detail_from_row,
    )
}

/// A patient's payments, newest first.
pub fn find_payments_by_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<PaymentDetail>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{} WHERE pay.patient_id = ?1 ORDER BY pay.created_at DESC, pay.id DESC",
            select_details()
        ),
        params![patient_id],
        read_detail,
        detail_from_row,
    )
}

struct PaymentRow {
    id: i64,
    patient_id: i64,
    registration_id: Option<i64>,
    medicine_id: Option<i64>,
    payment_type: String,
    amount_cents: i64,
    status: String,
    payment_method: String,
    transaction_id: Option<String>,
    quantity: i64,
    description: Option<String>,
    notes: Option<String>,
    paid_at: Option<String>,
    refunded_at: Option<String>,
    created_by: Option<i64>,
    created_at: String,
    updated_at: String,
}

fn read_payment(row: &Row<'_>, base: usize) -> Result<PaymentRow, rusqlite::Error> {
    Ok(PaymentRow {
        id: row.get(base)?,
        patient_id: row.get(base + 1)?,
        registration_id: row.get(base + 2)?,
        medicine_id: row.get(base + 3)?,
        payment_type: row.get(base + 4)?,
        amount_cents: row.get(base + 5)?,
        status: row.get(base + 6)?,
        payment_method: row.get(base + 7)?,
        transaction_id: row.get(base + 8)?,
        quantity: row.get(base + 9)?,
        description: row.get(base + 10)?,
        notes: row.get(base + 11)?,
        paid_at: row.get(base + 12)?,
        refunded_at: row.get(base + 13)?,
        created_by: row.get(base + 14)?,
        created_at: row.get(base + 15)?,
        updated_at: row.get(base + 16)?,
    })
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, DatabaseError> {
    Ok(Payment {
        id: row.id,
        patient_id: row.patient_id,
        registration_id: row.registration_id,
        medicine_id: row.medicine_id,
        payment_type: PaymentType::from_str(&row.payment_type)?,
        amount: from_cents(row.amount_cents),
        status: PaymentStatus::from_str(&row.status)?,
        payment_method: row.payment_method,
        transaction_id: row.transaction_id,
        quantity: row.quantity,
        description: row.description,
        notes: row.notes,
        paid_at: parse_opt_ts("paid_at", row.paid_at)?,
        refunded_at: parse_opt_ts("refunded_at", row.refunded_at)?,
        created_by: row.created_by,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}

type DetailRow = (PaymentRow, PatientRow, Option<RegistrationRow>, Option<MedicineRow>);

fn read_detail(row: &Row<'_>) -> Result<DetailRow, rusqlite::Error> {
    let patient_base = PAYMENT_FIELDS.len();
    let registration_base = patient_base + PATIENT_FIELDS.len();
    let medicine_base = registration_base + REGISTRATION_FIELDS.len();

    // LEFT JOIN misses come back as an all-NULL block.
    let registration = match row.get::<_, Option<i64>>(registration_base)? {
        Some(_) => Some(read_registration(row, registration_base)?),
        None => None,
    };
    let medicine = match row.get::<_, Option<i64>>(medicine_base)? {
        Some(_) => Some(read_medicine(row, medicine_base)?),
        None => None,
    };
    Ok((
        read_payment(row, 0)?,
        read_patient(row, patient_base)?,
        registration,
        medicine,
    ))
}

fn detail_from_row(
    (payment, patient, registration, medicine): DetailRow,
) -> Result<PaymentDetail, DatabaseError> {
    Ok(PaymentDetail {
        payment: payment_from_row(payment)?,
        patient: patient_from_row(patient)?,
        registration: registration.map(registration_from_row).transpose()?,
        medicine: medicine.map(medicine_from_row).transpose()?,
    })
}
