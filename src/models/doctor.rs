use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::Gender;
use super::validation::{FieldErrors, PHONE_RE};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub gender: Gender,
    pub department: String,
    pub title: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub introduction: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRequest {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub introduction: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct DoctorInput {
    pub name: String,
    pub gender: Gender,
    pub department: String,
    pub title: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub introduction: Option<String>,
    pub consultation_fee: Option<Decimal>,
    pub available: bool,
}

impl DoctorRequest {
    pub fn validate(self) -> Result<DoctorInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", self.name, 2, 20);
        let gender = errors.required("gender", self.gender);
        let department = errors.required_text("department", self.department, 2, 50);
        let title = errors.required_text("title", self.title, 2, 20);
        let phone = errors.optional_text("phone", self.phone, 0, 20);
        errors.matches("phone", phone.as_deref(), &PHONE_RE, "invalid phone number");
        let email = errors.optional_text("email", self.email, 0, 50);
        errors.email("email", email.as_deref());
        let specialization = errors.optional_text("specialization", self.specialization, 0, 200);
        let introduction = errors.optional_text("introduction", self.introduction, 0, 500);
        if let Some(fee) = self.consultation_fee {
            errors.money("consultationFee", fee, min_fee(), max_fee(), 4);
        }

        errors.finish(DoctorInput {
            name,
            gender: gender.unwrap_or(Gender::Male),
            department,
            title,
            phone,
            email,
            specialization,
            introduction,
            consultation_fee: self.consultation_fee,
            available: self.available.unwrap_or(true),
        })
    }
}

/// Consultation and registration fees share one window.
pub fn min_fee() -> Decimal {
    Decimal::new(1, 2)
}

pub fn max_fee() -> Decimal {
    Decimal::from_str("9999.99").unwrap_or(Decimal::MAX)
}
