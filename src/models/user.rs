use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::Role;
use super::validation::{FieldErrors, PHONE_RE};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 100;

/// Back-office account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub real_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub enabled: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

/// Validated user fields. `password` is plain text here; the service hashes it.
#[derive(Debug, Clone)]
pub struct UserInput {
    pub username: String,
    pub password: Option<String>,
    pub real_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub enabled: bool,
}

impl UserRequest {
    pub fn validate_create(self) -> Result<UserInput, FieldErrors> {
        self.validate(true)
    }

    /// Same rules as create, except a missing or blank password means "keep".
    pub fn validate_update(self) -> Result<UserInput, FieldErrors> {
        self.validate(false)
    }

    fn validate(self, password_required: bool) -> Result<UserInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = errors.required_text("username", self.username, 3, 50);
        let password = if password_required {
            Some(errors.required_text("password", self.password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN))
        } else {
            errors.optional_text("password", self.password, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN)
        };
        let real_name = errors.required_text("realName", self.real_name, 1, 50);
        let email = errors.optional_text("email", self.email, 0, 100);
        errors.email("email", email.as_deref());
        let phone = errors.optional_text("phone", self.phone, 0, 20);
        errors.matches("phone", phone.as_deref(), &PHONE_RE, "invalid phone number");
        let role = errors.required("role", self.role);

        errors.finish(UserInput {
            username,
            password,
            real_name,
            email,
            phone,
            role: role.unwrap_or(Role::Staff),
            enabled: self.enabled.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

/// Validate a replacement password on its own.
pub fn validate_new_password(field: &str, value: Option<String>) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();
    let password = errors.required_text(field, value, MIN_PASSWORD_LEN, MAX_PASSWORD_LEN);
    errors.finish(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UserRequest {
        UserRequest {
            username: Some("nurse01".into()),
            password: Some("secret1".into()),
            real_name: Some("Wang Fang".into()),
            email: Some("wang@example.com".into()),
            phone: Some("13900001111".into()),
            role: Some(Role::Staff),
            enabled: None,
        }
    }

    #[test]
    fn create_requires_password() {
        let mut req = request();
        req.password = None;
        let errors = req.validate_create().unwrap_err();
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn update_allows_missing_password() {
        let mut req = request();
        req.password = Some("".into());
        let input = req.validate_update().unwrap();
        assert!(input.password.is_none());
        assert!(input.enabled);
    }

    #[test]
    fn rejects_bad_email_and_role() {
        let mut req = request();
        req.email = Some("not-an-email".into());
        req.role = None;
        let errors = req.validate_create().unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("role").is_some());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let user = User {
            id: 1,
            username: "admin".into(),
            password_hash: "pbkdf2-sha256$1$x$y".into(),
            real_name: "Admin".into(),
            email: None,
            phone: None,
            role: Role::Admin,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["realName"], "Admin");
        assert_eq!(json["role"], "ADMIN");
    }
}
