use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::{
    contains_pattern, ensure_changed, fetch_page, fmt_ts, from_cents, parse_ts, query_all,
    query_one, select_list, to_cents,
};
use crate::db::DatabaseError;
use crate::models::*;

pub(crate) const MEDICINE_FIELDS: &[&str] = &[
    "id",
    "name",
    "code",
    "category",
    "specification",
    "unit",
    "price_cents",
    "stock",
    "manufacturer",
    "indication",
    "dosage",
    "dosage_form",
    "side_effects",
    "contraindications",
    "available",
    "created_at",
    "updated_at",
];

const MEDICINE_SORTABLE: &[(&str, &str)] = &[
    ("id", "m.id"),
    ("name", "m.name"),
    ("code", "m.code"),
    ("category", "m.category"),
    ("price", "m.price_cents"),
    ("stock", "m.stock"),
    ("createdAt", "m.created_at"),
    ("updatedAt", "m.updated_at"),
];

fn select_medicines() -> String {
    format!("SELECT {} FROM medicines m", select_list("m", MEDICINE_FIELDS))
}

pub fn insert_medicine(
    conn: &Connection,
    input: &MedicineInput,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medicines (name, code, category, specification, unit, price_cents, stock,
         manufacturer, indication, dosage, dosage_form, side_effects, contraindications,
         available, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        params![
            input.name,
            input.code,
            input.category,
            input.specification,
            input.unit,
            to_cents(input.price)?,
            input.stock,
            input.manufacturer,
            input.indication,
            input.dosage,
            input.dosage_form,
            input.side_effects,
            input.contraindications,
            input.available,
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn update_medicine(
    conn: &Connection,
    id: i64,
    input: &MedicineInput,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE medicines SET name = ?1, code = ?2, category = ?3, specification = ?4,
             unit = ?5, price_cents = ?6, stock = ?7, manufacturer = ?8, indication = ?9,
             dosage = ?10, dosage_form = ?11, side_effects = ?12, contraindications = ?13,
             available = ?14, updated_at = ?15
             WHERE id = ?16",
            params![
                input.name,
                input.code,
                input.category,
                input.specification,
                input.unit,
                to_cents(input.price)?,
                input.stock,
                input.manufacturer,
                input.indication,
                input.dosage,
                input.dosage_form,
                input.side_effects,
                input.contraindications,
                input.available,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Medicine", id)
}

/// Overwrite the stock level.
pub fn set_medicine_stock(
    conn: &Connection,
    id: i64,
    stock: i64,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE medicines SET stock = ?1, updated_at = ?2 WHERE id = ?3",
            params![stock, fmt_ts(&now), id],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Medicine", id)
}

pub fn delete_medicine(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM medicines WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "Medicine", id)
}

pub fn find_medicine_by_id(conn: &Connection, id: i64) -> Result<Option<Medicine>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE m.id = ?1", select_medicines()),
        params![id],
        |row| read_medicine(row, 0),
        medicine_from_row,
    )
}

pub fn find_medicine_by_code(conn: &Connection, code: &str) -> Result<Option<Medicine>, DatabaseError> {
    query_one(
        conn,
        &format!("{} WHERE m.code = ?1", select_medicines()),
        params![code],
        |row| read_medicine(row, 0),
        medicine_from_row,
    )
}

pub fn exists_medicine_by_code(
    conn: &Connection,
    code: &str,
    excluding_id: Option<i64>,
) -> Result<bool, DatabaseError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM medicines WHERE code = ?1 AND (?2 IS NULL OR id != ?2))",
        params![code, excluding_id],
        |row| row.get(0),
    )?)
}

/// Page of medicines, optionally restricted to one category.
pub fn find_medicine_page(
    conn: &Connection,
    page: &PageRequest,
    category: Option<&str>,
) -> Result<PageResponse<Medicine>, DatabaseError> {
    fetch_page(
        conn,
        &format!("{} WHERE (?1 IS NULL OR m.category = ?1)", select_medicines()),
        "SELECT COUNT(*) FROM medicines WHERE (?1 IS NULL OR category = ?1)",
        params![category],
        page,
        MEDICINE_SORTABLE,
        "m.id",
        |row| read_medicine(row, 0),
        medicine_from_row,
    )
}

pub fn search_medicines_by_name(conn: &Connection, name: &str) -> Result<Vec<Medicine>, DatabaseError> {
    query_all(
        conn,
        &format!("{} WHERE m.name LIKE ?1 ESCAPE '\\' ORDER BY m.name, m.id", select_medicines()),
        params![contains_pattern(name)],
        |row| read_medicine(row, 0),
        medicine_from_row,
    )
}

/// Available medicines at or below `threshold`, lowest stock first.
pub fn find_low_stock_medicines(
    conn: &Connection,
    threshold: i64,
) -> Result<Vec<Medicine>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "{} WHERE m.available = 1 AND m.stock <= ?1 ORDER BY m.stock ASC, m.id ASC",
            select_medicines()
        ),
        params![threshold],
        |row| read_medicine(row, 0),
        medicine_from_row,
    )
}

pub(crate) struct MedicineRow {
    id: i64,
    name: String,
    code: String,
    category: Option<String>,
    specification: String,
    unit: String,
    price_cents: i64,
    stock: i64,
    manufacturer: Option<String>,
    indication: Option<String>,
    dosage: Option<String>,
    dosage_form: Option<String>,
    side_effects: Option<String>,
    contraindications: Option<String>,
    available: bool,
    created_at: String,
    updated_at: String,
}

/// Read `MEDICINE_FIELDS` starting at column `base`.
pub(crate) fn read_medicine(row: &Row<'_>, base: usize) -> Result<MedicineRow, rusqlite::Error> {
    Ok(MedicineRow {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        code: row.get(base + 2)?,
        category: row.get(base + 3)?,
        specification: row.get(base + 4)?,
        unit: row.get(base + 5)?,
        price_cents: row.get(base + 6)?,
        stock: row.get(base + 7)?,
        manufacturer: row.get(base + 8)?,
        indication: row.get(base + 9)?,
        dosage: row.get(base + 10)?,
        dosage_form: row.get(base + 11)?,
        side_effects: row.get(base + 12)?,
        contraindications: row.get(base + 13)?,
        available: row.get(base + 14)?,
        created_at: row.get(base + 15)?,
        updated_at: row.get(base + 16)?,
    })
}

pub(crate) fn medicine_from_row(row: MedicineRow) -> Result<Medicine, DatabaseError> {
    Ok(Medicine {
        id: row.id,
        name: row.name,
        code: row.code,
        category: row.category,
        specification: row.specification,
        unit: row.unit,
        price: from_cents(row.price_cents),
        stock: row.stock,
        manufacturer: row.manufacturer,
        indication: row.indication,
        dosage: row.dosage,
        dosage_form: row.dosage_form,
        side_effects: row.side_effects,
        contraindications: row.contraindications,
        available: row.available,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::local_now;
    use crate::db::sqlite::open_memory_database;
    use rust_decimal::Decimal;

    fn input(code: &str, category: &str, stock: i64) -> MedicineInput {
        MedicineInput {
            name: format!("Medicine {code}"),
            code: code.into(),
            category: Some(category.into()),
            specification: "10mg x 30".into(),
            unit: "box".into(),
            price: Decimal::new(1250, 2),
            stock,
            manufacturer: None,
            indication: None,
            dosage: None,
            dosage_form: None,
            side_effects: None,
            contraindications: None,
            available: true,
        }
    }

    #[test]
    fn codes_are_unique_and_case_sensitive() {
        let conn = open_memory_database().unwrap();
        insert_medicine(&conn, &input("ABCD", "Antibiotic", 5), local_now()).unwrap();
        assert!(exists_medicine_by_code(&conn, "ABCD", None).unwrap());
        assert!(!exists_medicine_by_code(&conn, "abcd", None).unwrap());
        let err = insert_medicine(&conn, &input("ABCD", "Antibiotic", 5), local_now()).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn low_stock_excludes_unavailable_and_orders_ascending() {
        let conn = open_memory_database().unwrap();
        insert_medicine(&conn, &input("AAAA", "X", 8), local_now()).unwrap();
        insert_medicine(&conn, &input("BBBB", "X", 2), local_now()).unwrap();
        insert_medicine(&conn, &input("CCCC", "X", 50), local_now()).unwrap();
        let mut hidden = input("DDDD", "X", 0);
        hidden.available = false;
        insert_medicine(&conn, &hidden, local_now()).unwrap();

        let low: Vec<String> = find_low_stock_medicines(&conn, 10)
            .unwrap()
            .into_iter()
            .map(|m| m.code)
            .collect();
        assert_eq!(low, vec!["BBBB", "AAAA"]);
    }

    #[test]
    fn stock_overwrite_accepts_zero() {
        let conn = open_memory_database().unwrap();
        let id = insert_medicine(&conn, &input("AAAA", "X", 8), local_now()).unwrap();
        set_medicine_stock(&conn, id, 0, local_now()).unwrap();
        assert_eq!(find_medicine_by_id(&conn, id).unwrap().unwrap().stock, 0);
    }

    #[test]
    fn category_filter_applies_to_page_and_count() {
        let conn = open_memory_database().unwrap();
        insert_medicine(&conn, &input("AAAA", "Antibiotic", 1), local_now()).unwrap();
        insert_medicine(&conn, &input("BBBB", "Analgesic", 1), local_now()).unwrap();
        let page = find_medicine_page(&conn, &PageRequest::default(), Some("Analgesic")).unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].code, "BBBB");
        let all = find_medicine_page(&conn, &PageRequest::default(), None).unwrap();
        assert_eq!(all.total_elements, 2);
    }
}
