use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::FeedbackStatus;
use super::validation::FieldErrors;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub feedback_type: String,
    pub content: String,
    pub processing_notes: Option<String>,
    pub status: FeedbackStatus,
    pub created_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub processed_by_id: Option<i64>,
    pub processed_by_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub feedback_type: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedbackInput {
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub feedback_type: String,
    pub content: String,
}

impl FeedbackRequest {
    pub fn validate(self) -> Result<FeedbackInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let contact_name = errors.required_text("contactName", self.contact_name, 1, 50);
        let contact_phone = errors.optional_text("contactPhone", self.contact_phone, 0, 20);
        let contact_email = errors.optional_text("contactEmail", self.contact_email, 0, 100);
        errors.email("contactEmail", contact_email.as_deref());
        let feedback_type = errors.required_text("feedbackType", self.feedback_type, 1, 20);
        let content = errors.required_text("content", self.content, 1, 2000);

        errors.finish(FeedbackInput {
            contact_name,
            contact_phone,
            contact_email,
            feedback_type,
            content,
        })
    }
}

/// Processing notes share the same bound wherever they are written.
pub fn validate_processing_notes(value: Option<String>) -> Result<Option<String>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let notes = errors.optional_text("processingNotes", value, 0, 500);
    errors.finish(notes)
}
