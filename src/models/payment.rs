use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{PaymentStatus, PaymentType};
use super::medicine::Medicine;
use super::patient::Patient;
use super::registration::Registration;
use super::validation::FieldErrors;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub patient_id: i64,
    pub registration_id: Option<i64>,
    pub medicine_id: Option<i64>,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub quantity: i64,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub paid_at: Option<NaiveDateTime>,
    pub refunded_at: Option<NaiveDateTime>,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A payment read together with the rows it references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    pub patient: Patient,
    pub registration: Option<Registration>,
    pub medicine: Option<Medicine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub patient_id: Option<i64>,
    pub registration_id: Option<i64>,
    pub medicine_id: Option<i64>,
    pub payment_type: Option<PaymentType>,
    pub amount: Option<Decimal>,
    pub payment_method: Option<String>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Validated payment fields. On update, `None` references keep the current ones.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub patient_id: Option<i64>,
    pub registration_id: Option<i64>,
    pub medicine_id: Option<i64>,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub payment_method: String,
    pub quantity: i64,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl PaymentRequest {
    pub fn validate_create(self) -> Result<PaymentInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("patientId", self.patient_id);
        self.validate_fields(errors)
    }

    pub fn validate_update(self) -> Result<PaymentInput, FieldErrors> {
        self.validate_fields(FieldErrors::new())
    }

    fn validate_fields(self, mut errors: FieldErrors) -> Result<PaymentInput, FieldErrors> {
        let payment_type = errors.required("paymentType", self.payment_type);
        let amount = errors.required("amount", self.amount);
        if let Some(a) = amount {
            errors.money("amount", a, Decimal::new(1, 2), max_amount(), 5);
        }
        let payment_method = errors.required_text("paymentMethod", self.payment_method, 1, 50);
        let quantity = self.quantity.unwrap_or(1);
        if quantity < 1 {
            errors.add("quantity", "must be greater than or equal to 1");
        }
        let description = errors.optional_text("description", self.description, 0, 500);
        let notes = errors.optional_text("notes", self.notes, 0, 500);

        errors.finish(PaymentInput {
            patient_id: self.patient_id,
            registration_id: self.registration_id,
            medicine_id: self.medicine_id,
            payment_type: payment_type.unwrap_or(PaymentType::Registration),
            amount: amount.unwrap_or_default(),
            payment_method,
            quantity,
            description,
            notes,
        })
    }
}

pub fn max_amount() -> Decimal {
    Decimal::from_str("99999.99").unwrap_or(Decimal::MAX)
}
