use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::{
    contains_pattern, ensure_changed, fetch_page, fmt_ts, from_cents, parse_ts, query_all,
    query_one, select_list, to_cents,
};
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const DOCTOR_FIELDS: &[&str] = &[
    "id",
    "name",
    "gender",
    "department",
    "title",
    "phone",
    "email",
    "specialization",
    "introduction",
    "consultation_fee_cents",
    "available",
    "created_at",
    "updated_at",
];

const DOCTOR_SORTABLE: &[(&str, &str)] = &[
    ("id", "d.id"),
    ("name", "d.name"),
    ("department", "d.department"),
    ("title", "d.title"),
    ("consultationFee", "d.consultation_fee_cents"),
    ("available", "d.available"),
    ("createdAt", "d.created_at"),
    ("updatedAt", "d.updated_at"),
];

fn select_doctors() -> String {
    format!("SELECT {} FROM doctors d", select_list("d", DOCTOR_FIELDS))
}

pub fn insert_doctor(
    conn: &Connection,
    input: &DoctorInput,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    let fee = input.consultation_fee.map(to_cents).transpose()?;
    conn.execute(
        "INSERT INTO doctors (name, gender, department, title, phone, email, specialization,
         introduction, consultation_fee_cents, available, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            input.name,
            input.gender.as_str(),
            input.department,
            input.title,
            input.phone,
            input.email,
            input.specialization,
            input.introduction,
            fee,
            input.available,
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn update_doctor(
    conn: &Connection,
    id: i64,
    input: &DoctorInput,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let fee = input.consultation_fee.map(to_cents).transpose()?;
    let changed = conn
        .execute(
            "UPDATE doctors SET name = ?1, gender = ?2, department = ?3, title = ?4, phone = ?5,
             email = ?6, specialization = ?7, introduction = ?8, consultation_fee_cents = ?9,
             available = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                input.name,
                input.gender.as_str(),
                input.department,
                input.title,
                input.phone,
                input.email,
                input.specialization,
                input.introduction,
                fee,
                input.available,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Doctor", id)
}

pub fn delete_doctor(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM doctors WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Doctor", id)
}

pub fn find_doctor_by_id(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE d.id = ?1", select_doctors()),
        params![id],
        |row| read_doctor(row, 0),
        doctor_from_row,
    )
}

pub fn find_doctor_page(
    conn: &Connection,
    page: &PageRequest,
) -> Result<PageResponse<Doctor>, DatabaseError> {
    fetch_page(
        conn,
        &select_doctors(),
        "SELECT COUNT(*) FROM doctors",
        params![],
        page,
        DOCTOR_SORTABLE,
        "d.id",
        |row| read_doctor(row, 0),
        doctor_from_row,
    )
}

pub fn search_doctors_by_name(conn: &Connection, name: &str) -> Result<Vec<Doctor>, DatabaseError> {
    query_all(
        conn,
        &format!("{} WHERE d.name LIKE ?1 ESCAPE '\\' ORDER BY d.name, d.id", select_doctors()),
        params![contains_pattern(name)],
        |row| read_doctor(row, 0),
        doctor_from_row,
    )
}

pub fn find_doctors_by_department(
    conn: &Connection,
    department: &str,
) -> Result<Vec<Doctor>, DatabaseError> {
    query_all(
        conn,
        &format!("{} WHERE d.department = ?1 ORDER BY d.name, d.id", select_doctors()),
        params![department],
        |row| read_doctor(row, 0),
        doctor_from_row,
    )
}

pub fn find_available_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    query_all(
        conn,
        &format!("{} WHERE d.available = 1 ORDER BY d.department, d.name, d.id", select_doctors()),
        params![],
        |row| read_doctor(row, 0),
        doctor_from_row,
    )
}

/// Distinct department names, alphabetical.
pub fn find_departments(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT DISTINCT department FROM doctors ORDER BY department")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub(crate) struct DoctorRow {
    id: i64,
    name: String,
    gender: String,
    department: String,
    title: String,
    phone: Option<String>,
    email: Option<String>,
    specialization: Option<String>,
    introduction: Option<String>,
    consultation_fee_cents: Option<i64>,
    available: bool,
    created_at: String,
    updated_at: String,
}

/// Read `DOCTOR_FIELDS` starting at column `base`.
pub(crate) fn read_doctor(row: &Row<'_>, base: usize) -> Result<DoctorRow, rusqlite::Error> {
    Ok(DoctorRow {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        gender: row.get(base + 2)?,
        department: row.get(base + 3)?,
        title: row.get(base + 4)?,
        phone: row.get(base + 5)?,
        email: row.get(base + 6)?,
        specialization: row.get(base + 7)?,
        introduction: row.get(base + 8)?,
        consultation_fee_cents: row.get(base + 9)?,
        available: row.get(base + 10)?,
        created_at: row.get(base + 11)?,
        updated_at: row.get(base + 12)?,
    })
}

pub(crate) fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: row.id,
        name: row.name,
        gender: Gender::from_str(&row.gender)?,
        department: row.department,
        title: row.title,
        phone: row.phone,
        email: row.email,
        specialization: row.specialization,
        introduction: row.introduction,
        consultation_fee: row.consultation_fee_cents.map(from_cents),
        available: row.available,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}
