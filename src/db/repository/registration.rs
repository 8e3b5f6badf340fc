use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::doctor::{doctor_from_row, read_doctor, DoctorRow, DOCTOR_FIELDS};
use super::patient::{patient_from_row, read_patient, PatientRow, PATIENT_FIELDS};
use super::{
    ensure_changed, fetch_page, fmt_ts, from_cents, parse_ts, query_all, query_one, select_list,
    to_cents,
};
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const REGISTRATION_FIELDS: &[&str] = &[
    "id",
    "patient_id",
    "doctor_id",
    "appointment_time",
    "registration_fee_cents",
    "status",
    "symptoms",
    "diagnosis",
    "treatment",
    "prescription",
    "notes",
    "created_at",
    "updated_at",
];

const REGISTRATION_SORTABLE: &[(&str, &str)] = &[
    ("id", "r.id"),
    ("appointmentTime", "r.appointment_time"),
    ("registrationFee", "r.registration_fee_cents"),
    ("status", "r.status"),
    ("createdAt", "r.created_at"),
    ("updatedAt", "r.updated_at"),
    ("patientName", "p.name"),
    ("doctorName", "d.name"),
];

/// Registration columns, then patient columns, then doctor columns.
fn select_details() -> String {
    format!(
        "SELECT {}, {}, {} FROM registrations r
         JOIN patients p ON p.id = r.patient_id
         JOIN doctors d ON d.id = r.doctor_id",
        select_list("r", REGISTRATION_FIELDS),
        select_list("p", PATIENT_FIELDS),
        select_list("d", DOCTOR_FIELDS),
    )
}

/// Fully resolved registration values, references included.
pub struct NewRegistration<'a> {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub status: RegistrationStatus,
    pub fields: &'a RegistrationInput,
}

pub fn insert_registration(
    conn: &Connection,
    reg: &NewRegistration<'_>,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    let f = reg.fields;
    conn.execute(
        "INSERT INTO registrations (patient_id, doctor_id, appointment_time,
         registration_fee_cents, status, symptoms, diagnosis, treatment, prescription, notes,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            reg.patient_id,
            reg.doctor_id,
            fmt_ts(&f.appointment_time),
            to_cents(f.registration_fee)?,
            reg.status.as_str(),
            f.symptoms,
            f.diagnosis,
            f.treatment,
            f.prescription,
            f.notes,
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn update_registration(
    conn: &Connection,
    id: i64,
    reg: &NewRegistration<'_>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let f = reg.fields;
    let changed = conn
        .execute(
            "UPDATE registrations SET patient_id = ?1, doctor_id = ?2, appointment_time = ?3,
             registration_fee_cents = ?4, status = ?5, symptoms = ?6, diagnosis = ?7,
             treatment = ?8, prescription = ?9, notes = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                reg.patient_id,
                reg.doctor_id,
                fmt_ts(&f.appointment_time),
                to_cents(f.registration_fee)?,
                reg.status.as_str(),
                f.symptoms,
                f.diagnosis,
                f.treatment,
                f.prescription,
                f.notes,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Registration", id)
}

pub fn set_registration_status(
    conn: &Connection,
    id: i64,
    status: RegistrationStatus,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE registrations SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_ts(&now), id],
    )?;
    ensure_changed(changed, "Registration", id)
}

pub fn delete_registration(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM registrations WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Registration", id)
}

/// The bare registration row, without joins.
pub fn find_registration_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<Registration>, DatabaseError> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM registrations r WHERE r.id = ?1",
            select_list("r", REGISTRATION_FIELDS)
        ),
        params![id],
        |row| read_registration(row, 0),
        registration_from_row,
    )
}

pub fn find_registration_detail(
    conn: &Connection,
    id: i64,
) -> Result<Option<RegistrationDetail>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE r.id = ?1", select_details()),
        params![id],
        read_detail,
        detail_from_row,
    )
}

pub fn find_registration_page(
    conn: &Connection,
    page: &PageRequest,
) -> Result<PageResponse<RegistrationDetail>, DatabaseError> {
    fetch_page(
        conn,
        &select_details(),
        "SELECT COUNT(*) FROM registrations",
        params![],
        page,
        REGISTRATION_SORTABLE,
        "r.id",
        read_detail,
        detail_from_row,
    )
}

/// A patient's registrations, newest first.
pub fn find_registrations_by_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<RegistrationDetail>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{} WHERE r.patient_id = ?1 ORDER BY r.created_at DESC, r.id DESC",
            select_details()
        ),
        params![patient_id],
        read_detail,
        detail_from_row,
    )
}

/// A doctor's registrations, earliest appointment first.
pub fn find_registrations_by_doctor(
    conn: &Connection,
    doctor_id: i64,
) -> Result<Vec<RegistrationDetail>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{} WHERE r.doctor_id = ?1 ORDER BY r.appointment_time ASC, r.id ASC",
            select_details()
        ),
        params![doctor_id],
        read_detail,
        detail_from_row,
    )
}

pub(crate) struct RegistrationRow {
    id: i64,
    patient_id: i64,
    doctor_id: i64,
    appointment_time: String,
    registration_fee_cents: i64,
    status: String,
    symptoms: Option<String>,
    diagnosis: Option<String>,
    treatment: Option<String>,
    prescription: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Read `REGISTRATION_FIELDS` starting at column `base`.
pub(crate) fn read_registration(
    row: &Row<'_>,
    base: usize,
) -> Result<RegistrationRow, rusqlite::Error> {
    Ok(RegistrationRow {
        id: row.get(base)?,
        patient_id: row.get(base + 1)?,
        doctor_id: row.get(base + 2)?,
        appointment_time: row.get(base + 3)?,
        registration_fee_cents: row.get(base + 4)?,
        status: row.get(base + 5)?,
        symptoms: row.get(base + 6)?,
        diagnosis: row.get(base + 7)?,
        treatment: row.get(base + 8)?,
        prescription: row.get(base + 9)?,
        notes: row.get(base + 10)?,
        created_at: row.get(base + 11)?,
        updated_at: row.get(base + 12)?,
    })
}

pub(crate) fn registration_from_row(row: RegistrationRow) -> Result<Registration, DatabaseError> {
    Ok(Registration {
        id: row.id,
        patient_id: row.patient_id,
        doctor_id: row.doctor_id,
        appointment_time: parse_ts("appointment_time", &row.appointment_time)?,
        registration_fee: from_cents(row.registration_fee_cents),
        status: RegistrationStatus::from_str(&row.status)?,
        symptoms: row.symptoms,
        diagnosis: row.diagnosis,
        treatment: row.treatment,
        prescription: row.prescription,
        notes: row.notes,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}

fn read_detail(
    row: &Row<'_>,
) -> Result<(RegistrationRow, PatientRow, DoctorRow), rusqlite::Error> {
    let patient_base = REGISTRATION_FIELDS.len();
    let doctor_base = patient_base + PATIENT_FIELDS.len();
    Ok((
        read_registration(row, 0)?,
        read_patient(row, patient_base)?,
        read_doctor(row, doctor_base)?,
    ))
}

fn detail_from_row(
    (registration, patient, doctor): (RegistrationRow, PatientRow, DoctorRow),
) -> Result<RegistrationDetail, DatabaseError> {
    Ok(RegistrationDetail {
        registration: registration_from_row(registration)?,
        patient: patient_from_row(patient)?,
        doctor: doctor_from_row(doctor)?,
    })
}
