use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::doctor::{max_fee, min_fee, Doctor};
use super::enums::RegistrationStatus;
use super::patient::Patient;
use super::validation::FieldErrors;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_time: NaiveDateTime,
    pub registration_fee: Decimal,
    pub status: RegistrationStatus,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A registration read together with its patient and doctor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetail {
    #[serde(flatten)]
    pub registration: Registration,
    pub patient: Patient,
    pub doctor: Doctor,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub appointment_time: Option<NaiveDateTime>,
    pub registration_fee: Option<Decimal>,
    pub status: Option<RegistrationStatus>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

/// Validated registration fields. On update, `None` references keep the
/// current patient or doctor and `None` status keeps the current status.
#[derive(Debug, Clone)]
pub struct RegistrationInput {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub appointment_time: NaiveDateTime,
    pub registration_fee: Decimal,
    pub status: Option<RegistrationStatus>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
}

impl RegistrationRequest {
    /// Patient and doctor are required and the appointment must be after `now`.
    pub fn validate_create(self, now: NaiveDateTime) -> Result<RegistrationInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("patientId", self.patient_id);
        errors.required("doctorId", self.doctor_id);
        if let Some(at) = self.appointment_time {
            if at <= now {
                errors.add("appointmentTime", "must be a future date");
            }
        }
        self.validate_fields(errors)
    }

    pub fn validate_update(self) -> Result<RegistrationInput, FieldErrors> {
        self.validate_fields(FieldErrors::new())
    }

    fn validate_fields(self, mut errors: FieldErrors) -> Result<RegistrationInput, FieldErrors> {
        let appointment_time = errors.required("appointmentTime", self.appointment_time);
        let fee = errors.required("registrationFee", self.registration_fee);
        if let Some(f) = fee {
            errors.money("registrationFee", f, min_fee(), max_fee(), 4);
        }
        let symptoms = errors.optional_text("symptoms", self.symptoms, 0, 500);
        let diagnosis = errors.optional_text("diagnosis", self.diagnosis, 0, 500);
        let treatment = errors.optional_text("treatment", self.treatment, 0, 500);
        let prescription = errors.optional_text("prescription", self.prescription, 0, 500);
        let notes = errors.optional_text("notes", self.notes, 0, 300);

        errors.finish(RegistrationInput {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            appointment_time: appointment_time.unwrap_or_default(),
            registration_fee: fee.unwrap_or_default(),
            status: self.status,
            symptoms,
            diagnosis,
            treatment,
            prescription,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            patient_id: Some(1),
            doctor_id: Some(2),
            appointment_time: Some(now() + chrono::Duration::hours(2)),
            registration_fee: Some(Decimal::new(2000, 2)),
            ..Default::default()
        }
    }

    #[test]
    fn create_accepts_future_appointment() {
        let input = request().validate_create(now()).unwrap();
        assert_eq!(input.patient_id, Some(1));
        assert!(input.status.is_none());
    }

    #[test]
    fn create_rejects_past_appointment() {
        let mut req = request();
        req.appointment_time = Some(now() - chrono::Duration::minutes(1));
        let errors = req.validate_create(now()).unwrap_err();
        assert_eq!(errors.get("appointmentTime"), Some("must be a future date"));
    }

    #[test]
    fn update_does_not_require_references() {
        let mut req = request();
        req.patient_id = None;
        req.doctor_id = None;
        req.appointment_time = Some(now() - chrono::Duration::days(1));
        assert!(req.validate_update().is_ok());
    }

    #[test]
    fn long_notes_are_rejected() {
        let mut req = request();
        req.notes = Some("n".repeat(301));
        let errors = req.validate_create(now()).unwrap_err();
        assert!(errors.get("notes").is_some());
    }
}
