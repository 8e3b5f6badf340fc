//! User account management.

use rusqlite::Connection;

use crate::crypto::{hash_password, verify_password};
use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

pub fn create_user(conn: &mut Connection, req: UserRequest, iterations: u32) -> ServiceResult<User> {
    let input = req.validate_create()?;
    let tx = conn.transaction()?;
    ensure_unique(&tx, &input, None)?;

    let password = input.password.as_deref().unwrap_or_default();
    let hash = hash_password(password, iterations);
    let id = db::insert_user(&tx, &input, &hash, db::local_now())?;
    let user = load(&tx, id)?;
    tx.commit()?;

    tracing::info!(user_id = id, username = %user.username, role = %user.role, "User created");
    Ok(user)
}

pub fn get_user(conn: &Connection, id: i64) -> ServiceResult<User> {
    load(conn, id)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> ServiceResult<User> {
    db::find_user_by_username(conn, username)?
        .ok_or_else(|| ServiceError::not_found("User", username))
}

/// Update profile fields; the password changes only when a new one is supplied.
pub fn update_user(
    conn: &mut Connection,
    id: i64,
    req: UserRequest,
    iterations: u32,
) -> ServiceResult<User> {
    let input = req.validate_update()?;
    let tx = conn.transaction()?;
    load(&tx, id)?;
    ensure_unique(&tx, &input, Some(id))?;

    let hash = input.password.as_deref().map(|p| hash_password(p, iterations));
    db::update_user(&tx, id, &input, hash.as_deref(), db::local_now())?;
    let user = load(&tx, id)?;
    tx.commit()?;

    tracing::info!(user_id = id, password_changed = hash.is_some(), "User updated");
    Ok(user)
}

pub fn delete_user(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_user(&tx, id)?;
    tx.commit()?;
    tracing::info!(user_id = id, "User deleted");
    Ok(())
}

pub fn list_users(conn: &Connection, page: &PageRequest) -> ServiceResult<PageResponse<User>> {
    Ok(db::find_user_page(conn, page)?)
}

pub fn users_by_role(conn: &Connection, role: Role) -> ServiceResult<Vec<User>> {
    Ok(db::find_users_by_role(conn, role)?)
}

pub fn search_users(conn: &Connection, real_name: &str) -> ServiceResult<Vec<User>> {
    Ok(db::search_users_by_real_name(conn, real_name.trim())?)
}

/// Flip the enabled flag and return the updated user.
pub fn toggle_user_status(conn: &mut Connection, id: i64) -> ServiceResult<User> {
    let tx = conn.transaction()?;
    let user = load(&tx, id)?;
    db::set_user_enabled(&tx, id, !user.enabled, db::local_now())?;
    let user = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(user_id = id, enabled = user.enabled, "User status toggled");
    Ok(user)
}

/// Administrative reset; no knowledge of the old password needed.
pub fn reset_password(
    conn: &mut Connection,
    id: i64,
    req: ResetPasswordRequest,
    iterations: u32,
) -> ServiceResult<()> {
    let password = validate_new_password("newPassword", req.new_password)?;
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::set_user_password(&tx, id, &hash_password(&password, iterations), db::local_now())?;
    tx.commit()?;
    tracing::info!(user_id = id, "Password reset");
    Ok(())
}

/// Self-service change; the old password must match.
pub fn change_password(
    conn: &mut Connection,
    id: i64,
    req: ChangePasswordRequest,
    iterations: u32,
) -> ServiceResult<()> {
    let old = req.old_password.unwrap_or_default();
    if old.is_empty() {
        return Err(ServiceError::field("oldPassword", "must not be blank"));
    }
    let new = validate_new_password("newPassword", req.new_password)?;

    let tx = conn.transaction()?;
    let user = load(&tx, id)?;
    if !verify_password(&old, &user.password_hash)? {
        tracing::warn!(user_id = id, "Password change rejected: old password mismatch");
        return Err(ServiceError::BusinessRule("Old password is incorrect".into()));
    }
    db::set_user_password(&tx, id, &hash_password(&new, iterations), db::local_now())?;
    tx.commit()?;
    tracing::info!(user_id = id, "Password changed");
    Ok(())
}

pub fn username_taken(conn: &Connection, username: &str) -> ServiceResult<bool> {
    Ok(db::exists_user_by_username(conn, username.trim(), None)?)
}

pub fn email_taken(conn: &Connection, email: &str) -> ServiceResult<bool> {
    Ok(db::exists_user_by_email(conn, email.trim(), None)?)
}

fn load(conn: &Connection, id: i64) -> ServiceResult<User> {
    db::find_user_by_id(conn, id)?.ok_or_else(|| ServiceError::not_found("User", id))
}

fn ensure_unique(conn: &Connection, input: &UserInput, excluding: Option<i64>) -> ServiceResult<()> {
    if db::exists_user_by_username(conn, &input.username, excluding)? {
        return Err(ServiceError::Conflict(format!(
            "Username already exists: {}",
            input.username
        )));
    }
    if let Some(email) = &input.email {
        if db::exists_user_by_email(conn, email, excluding)? {
            return Err(ServiceError::Conflict(format!("Email already exists: {email}")));
        }
    }
    Ok(())
}
