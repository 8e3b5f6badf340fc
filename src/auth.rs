//! Login and bearer-token resolution.

use std::borrow::Cow;

use rusqlite::Connection;
use serde::Serialize;

use crate::crypto::{dummy_hash, verify_password, TokenSigner};
use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Role, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_in: i64,
}

/// Identity of the caller behind a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Check credentials and issue a token. Every failure looks the same to the
/// caller, in outcome and in cost: unknown usernames are checked against a
/// dummy hash of `iterations` rounds.
pub fn login(
    conn: &Connection,
    signer: &TokenSigner,
    username: &str,
    password: &str,
    iterations: u32,
    now_unix: i64,
) -> ServiceResult<LoginResponse> {
    let username = username.trim();
    let user = db::find_user_by_username(conn, username)?;
    // A corrupt stored hash is indistinguishable from a wrong password here.
    let password_ok =
        verify_password(password, &hash_to_check(user.as_ref(), iterations)).unwrap_or(false);
    let Some(user) = user else {
        tracing::warn!(username, "Login rejected: unknown user");
        return Err(ServiceError::InvalidCredentials);
    };
    if !password_ok {
        tracing::warn!(user_id = user.id, "Login rejected: wrong password");
        return Err(ServiceError::InvalidCredentials);
    }
    if !user.enabled {
        tracing::warn!(user_id = user.id, "Login rejected: account disabled");
        return Err(ServiceError::InvalidCredentials);
    }

    let issued = signer.issue(user.id, &user.username, user.role, now_unix)?;
    tracing::info!(user_id = user.id, role = %user.role, "Login succeeded");
    Ok(LoginResponse {
        token: issued.token,
        user,
        expires_in: issued.expires_in,
    })
}

/// Stored hash of `user`, or a dummy of equal cost when there is none.
fn hash_to_check(user: Option<&User>, iterations: u32) -> Cow<'_, str> {
    match user {
        Some(user) => Cow::Borrowed(user.password_hash.as_str()),
        None => Cow::Owned(dummy_hash(iterations)),
    }
}

/// Resolve a token to a live, enabled account. `None` when any check fails.
pub fn authenticate(
    conn: &Connection,
    signer: &TokenSigner,
    token: &str,
    now_unix: i64,
) -> ServiceResult<Option<AuthUser>> {
    let claims = match signer.verify(token, now_unix) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected");
            return Ok(None);
        }
    };
    let user = db::find_user_by_id(conn, claims.sub)?;
    Ok(user.filter(|u| u.enabled).map(|u| AuthUser::from(&u)))
}
