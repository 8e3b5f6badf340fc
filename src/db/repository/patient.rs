use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::{
    contains_pattern, ensure_changed, fetch_page, fmt_ts, parse_date, parse_ts, query_all,
    query_one, select_list,
};
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const PATIENT_FIELDS: &[&str] = &[
    "id",
    "name",
    "gender",
    "birth_date",
    "id_card",
    "phone",
    "address",
    "email",
    "emergency_contact",
    "emergency_phone",
    "medical_history",
    "allergies",
    "created_at",
    "updated_at",
];

const PATIENT_SORTABLE: &[(&str, &str)] = &[
    ("id", "p.id"),
    ("name", "p.name"),
    ("gender", "p.gender"),
    ("birthDate", "p.birth_date"),
    ("idCard", "p.id_card"),
    ("phone", "p.phone"),
    ("createdAt", "p.created_at"),
    ("updatedAt", "p.updated_at"),
];

fn select_patients() -> String {
    format!("SELECT {} FROM patients p", select_list("p", PATIENT_FIELDS))
}

pub fn insert_patient(
    conn: &Connection,
    input: &PatientInput,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (name, gender, birth_date, id_card, phone, address, email,
         emergency_contact, emergency_phone, medical_history, allergies, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            input.name,
            input.gender.as_str(),
            input.birth_date.to_string(),
            input.id_card,
            input.phone,
            input.address,
            input.email,
            input.emergency_contact,
            input.emergency_phone,
            input.medical_history,
            input.allergies,
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn update_patient(
    conn: &Connection,
    id: i64,
    input: &PatientInput,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE patients SET name = ?1, gender = ?2, birth_date = ?3, id_card = ?4, phone = ?5,
             address = ?6, email = ?7, emergency_contact = ?8, emergency_phone = ?9,
             medical_history = ?10, allergies = ?11, updated_at = ?12
             WHERE id = ?13",
            params![
                input.name,
                input.gender.as_str(),
                input.birth_date.to_string(),
                input.id_card,
                input.phone,
                input.address,
                input.email,
                input.emergency_contact,
                input.emergency_phone,
                input.medical_history,
                input.allergies,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Patient", id)
}

pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM patients WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Patient", id)
}

pub fn find_patient_by_id(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE p.id = ?1", select_patients()),
        params![id],
        |row| read_patient(row, 0),
        patient_from_row,
    )
}

pub fn find_patient_by_id_card(
    conn: &Connection,
    id_card: &str,
) -> Result<Option<Patient>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE p.id_card = ?1", select_patients()),
        params![id_card],
        |row| read_patient(row, 0),
        patient_from_row,
    )
}

pub fn exists_patient_by_id_card(
    conn: &Connection,
    id_card: &str,
    excluding_id: Option<i64>,
) -> Result<bool, DatabaseError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE id_card = ?1 AND (?2 IS NULL OR id != ?2))",
        params![id_card, excluding_id],
        |row| row.get(0),
    )?)
}

pub fn find_patient_page(
    conn: &Connection,
    page: &PageRequest,
) -> Result<PageResponse<Patient>, DatabaseError> {
    fetch_page(
        conn,
        &select_patients(),
        "SELECT COUNT(*) FROM patients",
        params![],
        page,
        PATIENT_SORTABLE,
        "p.id",
        |row| read_patient(row, 0),
        patient_from_row,
    )
}

pub fn search_patients_by_name(conn: &Connection, name: &str) -> Result<Vec<Patient>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{} WHERE p.name LIKE ?1 ESCAPE '\\' ORDER BY p.created_at DESC, p.id DESC",
            select_patients()
        ),
        params![contains_pattern(name)],
        |row| read_patient(row, 0),
        patient_from_row,
    )
}

/// Exact or substring match on one of the identifying text columns.
pub fn search_patients_by_id_card(conn: &Connection, id_card: &str) -> Result<Vec<Patient>, DatabaseError> {
    search_patients_on(conn, "id_card", id_card)
}

pub fn search_patients_by_phone(conn: &Connection, phone: &str) -> Result<Vec<Patient>, DatabaseError> {
    search_patients_on(conn, "phone", phone)
}

fn search_patients_on(
    conn: &Connection,
    column: &'static str,
    value: &str,
) -> Result<Vec<Patient>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{} WHERE p.{column} = ?1 OR p.{column} LIKE ?2 ESCAPE '\\'
             ORDER BY p.created_at DESC, p.id DESC",
            select_patients()
        ),
        params![value, contains_pattern(value)],
        |row| read_patient(row, 0),
        patient_from_row,
    )
}

pub(crate) struct PatientRow {
    id: i64,
    name: String,
    gender: String,
    birth_date: String,
    id_card: String,
    phone: Option<String>,
    address: Option<String>,
    email: Option<String>,
    emergency_contact: Option<String>,
    emergency_phone: Option<String>,
    medical_history: Option<String>,
    allergies: Option<String>,
    created_at: String,
    updated_at: String,
}

/// Read `PATIENT_FIELDS` starting at column `base`.
pub(crate) fn read_patient(row: &Row<'_>, base: usize) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        gender: row.get(base + 2)?,
        birth_date: row.get(base + 3)?,
        id_card: row.get(base + 4)?,
        phone: row.get(base + 5)?,
        address: row.get(base + 6)?,
        email: row.get(base + 7)?,
        emergency_contact: row.get(base + 8)?,
        emergency_phone: row.get(base + 9)?,
        medical_history: row.get(base + 10)?,
        allergies: row.get(base + 11)?,
        created_at: row.get(base + 12)?,
        updated_at: row.get(base + 13)?,
    })
}

pub(crate) fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: row.id,
        name: row.name,
        gender: Gender::from_str(&row.gender)?,
        birth_date: parse_date("birth_date", &row.birth_date)?,
        id_card: row.id_card,
        phone: row.phone,
        address: row.address,
        email: row.email,
        emergency_contact: row.emergency_contact,
        emergency_phone: row.emergency_phone,
        medical_history: row.medical_history,
        allergies: row.allergies,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::local_now;
    use crate::db::sqlite::open_memory_database;
    use crate::models::SortDirection;
    use chrono::NaiveDate;

    fn input(name: &str, id_card: &str, phone: Option<&str>) -> PatientInput {
        PatientInput {
            name: name.into(),
            gender: Gender::Female,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20).unwrap(),
            id_card: id_card.into(),
            phone: phone.map(Into::into),
            address: None,
            email: None,
            emergency_contact: None,
            emergency_phone: None,
            medical_history: None,
            allergies: Some("penicillin".into()),
        }
    }

    #[test]
    fn insert_and_find_by_id_card() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &input("Liu Yang", "110105199005200021", None), local_now()).unwrap();
        let found = find_patient_by_id_card(&conn, "110105199005200021").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.birth_date, NaiveDate::from_ymd_opt(1990, 5, 20).unwrap());
        assert_eq!(found.allergies.as_deref(), Some("penicillin"));
    }

    #[test]
    fn duplicate_id_card_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &input("A", "110105199005200021", None), local_now()).unwrap();
        let err = insert_patient(&conn, &input("B", "110105199005200021", None), local_now()).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn phone_search_matches_exact_and_substring() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &input("A", "110105199005200021", Some("13800001111")), local_now()).unwrap();
        insert_patient(&conn, &input("B", "110105199005200039", Some("13900002222")), local_now()).unwrap();
        assert_eq!(search_patients_by_phone(&conn, "13800001111").unwrap().len(), 1);
        assert_eq!(search_patients_by_phone(&conn, "0000").unwrap().len(), 2);
    }

    #[test]
    fn name_search_escapes_wildcards() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &input("Wang_Li", "110105199005200021", None), local_now()).unwrap();
        insert_patient(&conn, &input("WangXLi", "110105199005200039", None), local_now()).unwrap();
        let found = search_patients_by_name(&conn, "Wang_").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Wang_Li");
    }

    #[test]
    fn page_returns_slice_and_true_total() {
        let conn = open_memory_database().unwrap();
        for i in 0..12 {
            let id_card = format!("1101051990052000{i:02}");
            insert_patient(&conn, &input(&format!("P{i:02}"), &id_card, None), local_now()).unwrap();
        }
        let page = find_patient_page(&conn, &PageRequest::new(0, 10)).unwrap();
        assert_eq!(page.content.len(), 10);
        assert_eq!(page.total_elements, 12);

        let by_name = PageRequest::new(1, 10).sorted("name", SortDirection::Asc);
        let second = find_patient_page(&conn, &by_name).unwrap();
        assert_eq!(second.content.len(), 2);
        assert_eq!(second.content[0].name, "P10");
    }
}
