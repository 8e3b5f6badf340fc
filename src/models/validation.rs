//! Request field validation.
//!
//! Request DTOs are deserialized with every field optional, then checked
//! here. All violations are collected per field, first message wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

/// Mainland mobile number: 11 digits starting with 13-19.
pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[3-9]\d{9}$").expect("valid phone regex"));

/// 18-character resident identity card number.
pub static ID_CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[1-9]\d{5}(18|19|20)\d{2}((0[1-9])|(1[0-2]))(([0-2][1-9])|10|20|30|31)\d{3}[0-9Xx]$",
    )
    .expect("valid id card regex")
});

pub static MEDICINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{4,20}$").expect("valid medicine code regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

/// Field name to message, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Return `value` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, "must not be null");
        }
        value
    }

    /// Non-blank text with a character-length window. Returns the trimmed value.
    pub fn required_text(
        &mut self,
        field: &str,
        value: Option<String>,
        min: usize,
        max: usize,
    ) -> String {
        let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            self.add(field, "must not be blank");
            return String::new();
        }
        self.check_length(field, trimmed, min, max);
        trimmed.to_string()
    }

    /// Optional text; blank collapses to `None`.
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<String>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let trimmed = value.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        self.check_length(field, trimmed, min, max);
        Some(trimmed.to_string())
    }

    pub fn matches(&mut self, field: &str, value: Option<&str>, re: &Regex, message: &str) {
        if let Some(v) = value {
            if !re.is_match(v) {
                self.add(field, message);
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        self.matches(field, value, &EMAIL_RE, "must be a well-formed email address");
    }

    /// Money bounds: at most two fraction digits, `integer_digits` before the point.
    pub fn money(
        &mut self,
        field: &str,
        value: Decimal,
        min: Decimal,
        max: Decimal,
        integer_digits: u32,
    ) {
        if value.normalize().scale() > 2 {
            self.add(
                field,
                format!("numeric value out of bounds (<{integer_digits} digits>.<2 digits> expected)"),
            );
        } else if value < min {
            self.add(field, format!("must be greater than or equal to {min}"));
        } else if value > max {
            self.add(field, format!("must be less than or equal to {max}"));
        }
    }

    pub fn range_i64(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min {
            self.add(field, format!("must be greater than or equal to {min}"));
        } else if value > max {
            self.add(field, format!("must be less than or equal to {max}"));
        }
    }

    fn check_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min || len > max {
            if min == 0 {
                self.add(field, format!("length must be at most {max}"));
            } else {
                self.add(field, format!("length must be between {min} and {max}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn required_text_trims_and_checks_length() {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", Some("  Li Lei ".into()), 2, 20);
        assert_eq!(name, "Li Lei");
        assert!(errors.is_empty());

        errors.required_text("short", Some("A".into()), 2, 20);
        errors.required_text("blank", Some("   ".into()), 2, 20);
        errors.required_text("missing", None, 2, 20);
        assert_eq!(errors.get("short"), Some("length must be between 2 and 20"));
        assert_eq!(errors.get("blank"), Some("must not be blank"));
        assert_eq!(errors.get("missing"), Some("must not be blank"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        errors.required_text("name", Some("张三".into()), 2, 20);
        assert!(errors.is_empty());
    }

    #[test]
    fn optional_text_collapses_blank() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.optional_text("notes", Some("  ".into()), 0, 10), None);
        assert_eq!(errors.optional_text("notes", None, 0, 10), None);
        errors.optional_text("notes", Some("x".repeat(11)), 0, 10);
        assert_eq!(errors.get("notes"), Some("length must be at most 10"));
    }

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = FieldErrors::new();
        errors.add("phone", "first");
        errors.add("phone", "second");
        assert_eq!(errors.get("phone"), Some("first"));
    }

    #[test]
    fn patterns_match_expected_shapes() {
        assert!(PHONE_RE.is_match("13812345678"));
        assert!(!PHONE_RE.is_match("12812345678"));
        assert!(ID_CARD_RE.is_match("11010519491231002X"));
        assert!(!ID_CARD_RE.is_match("01010519491231002X"));
        assert!(MEDICINE_CODE_RE.is_match("ABCD"));
        assert!(!MEDICINE_CODE_RE.is_match("abcd"));
        assert!(!MEDICINE_CODE_RE.is_match("ABC"));
    }

    #[test]
    fn money_rejects_three_fraction_digits_and_out_of_range() {
        let min = Decimal::from_str("0.01").unwrap();
        let max = Decimal::from_str("9999.99").unwrap();
        let mut errors = FieldErrors::new();
        errors.money("ok", Decimal::from_str("12.50").unwrap(), min, max, 4);
        errors.money("scale", Decimal::from_str("1.005").unwrap(), min, max, 4);
        errors.money("low", Decimal::ZERO, min, max, 4);
        errors.money("high", Decimal::from(10000), min, max, 4);
        assert!(errors.get("ok").is_none());
        assert!(errors.get("scale").is_some());
        assert!(errors.get("low").is_some());
        assert!(errors.get("high").is_some());
    }

    #[test]
    fn finish_returns_value_only_without_errors() {
        assert_eq!(FieldErrors::new().finish(5).unwrap(), 5);
        assert!(FieldErrors::single("x", "bad").finish(5).is_err());
    }
}
