use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::{contains_pattern, ensure_changed, fetch_page, fmt_ts, parse_ts, query_all, query_one};
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, username, password_hash, real_name, email, phone, role, enabled, created_at, updated_at";

const USER_SORTABLE: &[(&str, &str)] = &[
    ("id", "id"),
    ("username", "username"),
    ("realName", "real_name"),
    ("role", "role"),
    ("enabled", "enabled"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

pub fn insert_user(
    conn: &Connection,
    input: &UserInput,
    password_hash: &str,
    now: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password_hash, real_name, email, phone, role, enabled,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            input.username,
            password_hash,
            input.real_name,
            input.email,
            input.phone,
            input.role.as_str(),
            input.enabled,
            fmt_ts(&now),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

/// Update profile fields. The password hash is replaced only when given.
pub fn update_user(
    conn: &Connection,
    id: i64,
    input: &UserInput,
    password_hash: Option<&str>,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE users SET username = ?1, real_name = ?2, email = ?3, phone = ?4, role = ?5,
             enabled = ?6, password_hash = COALESCE(?7, password_hash), updated_at = ?8
             WHERE id = ?9",
            params![
                input.username,
                input.real_name,
                input.email,
                input.phone,
                input.role.as_str(),
                input.enabled,
                password_hash,
                fmt_ts(&now),
                id,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "User", id)
}

pub fn set_user_password(
    conn: &Connection,
    id: i64,
    password_hash: &str,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![password_hash, fmt_ts(&now), id],
    )?;
    ensure_changed(changed, "User", id)
}

pub fn set_user_enabled(
    conn: &Connection,
    id: i64,
    enabled: bool,
    now: NaiveDateTime,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET enabled = ?1, updated_at = ?2 WHERE id = ?3",
        params![enabled, fmt_ts(&now), id],
    )?;
    ensure_changed(changed, "User", id)
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn
        .execute("DELETE FROM users WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    ensure_changed(changed, "User", id)
}

pub fn find_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    query_one(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        read_user,
        user_from_row,
    )
}

pub fn find_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<User>, DatabaseError> {
    query_one(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        read_user,
        user_from_row,
    )
}

/// Whether another user (other than `excluding_id`) holds this username.
pub fn exists_user_by_username(
    conn: &Connection,
    username: &str,
    excluding_id: Option<i64>,
) -> Result<bool, DatabaseError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND (?2 IS NULL OR id != ?2))",
        params![username, excluding_id],
        |row| row.get(0),
    )?)
}

pub fn exists_user_by_email(
    conn: &Connection,
    email: &str,
    excluding_id: Option<i64>,
) -> Result<bool, DatabaseError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
        params![email, excluding_id],
        |row| row.get(0),
    )?)
}

pub fn find_user_page(conn: &Connection, page: &PageRequest) -> Result<PageResponse<User>, DatabaseError> {
    fetch_page(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users"),
        "SELECT COUNT(*) FROM users",
        params![],
        page,
        USER_SORTABLE,
        "id",
        read_user,
        user_from_row,
    )
}

pub fn find_users_by_role(conn: &Connection, role: Role) -> Result<Vec<User>, DatabaseError> {
    query_all(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY id"),
        params![role.as_str()],
        read_user,
        user_from_row,
    )
}

pub fn search_users_by_real_name(conn: &Connection, name: &str) -> Result<Vec<User>, DatabaseError> {
    query_all(
        conn,
        &format!(
            "SELECT {USER_COLUMNS} FROM users WHERE real_name LIKE ?1 ESCAPE '\\' ORDER BY id"
        ),
        params![contains_pattern(name)],
        read_user,
        user_from_row,
    )
}

struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    real_name: String,
    email: Option<String>,
    phone: Option<String>,
    role: String,
    enabled: bool,
    created_at: String,
    updated_at: String,
}

fn read_user(row: &Row<'_>) -> Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        real_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        role: row.get(6)?,
        enabled: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: row.id,
        username: row.username,
        password_hash: row.password_hash,
        real_name: row.real_name,
        email: row.email,
        phone: row.phone,
        role: Role::from_str(&row.role)?,
        enabled: row.enabled,
        created_at: parse_ts("created_at", &row.created_at)?,
        updated_at: parse_ts("updated_at", &row.updated_at)?,
    })
}
