use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::Gender;
use super::validation::{FieldErrors, ID_CARD_RE, PHONE_RE};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub id_card: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRequest {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub id_card: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PatientInput {
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub id_card: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

impl PatientRequest {
    /// `today` bounds the birth date, which must lie strictly in the past.
    pub fn validate(self, today: NaiveDate) -> Result<PatientInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", self.name, 2, 20);
        let gender = errors.required("gender", self.gender);
        let birth_date = errors.required("birthDate", self.birth_date);
        if let Some(date) = birth_date {
            if date >= today {
                errors.add("birthDate", "must be a past date");
            }
        }
        let id_card = errors.required_text("idCard", self.id_card, 1, 18);
        if !id_card.is_empty() && !ID_CARD_RE.is_match(&id_card) {
            errors.add("idCard", "invalid id card number");
        }
        let phone = errors.optional_text("phone", self.phone, 0, 20);
        errors.matches("phone", phone.as_deref(), &PHONE_RE, "invalid phone number");
        let address = errors.optional_text("address", self.address, 0, 100);
        let email = errors.optional_text("email", self.email, 0, 50);
        errors.email("email", email.as_deref());
        let emergency_contact =
            errors.optional_text("emergencyContact", self.emergency_contact, 2, 20);
        let emergency_phone = errors.optional_text("emergencyPhone", self.emergency_phone, 0, 20);
        errors.matches(
            "emergencyPhone",
            emergency_phone.as_deref(),
            &PHONE_RE,
            "invalid phone number",
        );
        let medical_history = errors.optional_text("medicalHistory", self.medical_history, 0, 2000);
        let allergies = errors.optional_text("allergies", self.allergies, 0, 1000);

        errors.finish(PatientInput {
            name,
            gender: gender.unwrap_or(Gender::Male),
            birth_date: birth_date.unwrap_or(today),
            id_card,
            phone,
            address,
            email,
            emergency_contact,
            emergency_phone,
            medical_history,
            allergies,
        })
    }
}
