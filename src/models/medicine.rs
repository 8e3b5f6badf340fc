use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{FieldErrors, MEDICINE_CODE_RE};

pub const MAX_STOCK: i64 = 999_999;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub specification: String,
    pub unit: String,
    pub price: Decimal,
    pub stock: i64,
    pub manufacturer: Option<String>,
    pub indication: Option<String>,
    pub dosage: Option<String>,
    pub dosage_form: Option<String>,
    pub side_effects: Option<String>,
    pub contraindications: Option<String>,
    pub available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub category: Option<String>,
    pub specification: Option<String>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub manufacturer: Option<String>,
    pub indication: Option<String>,
    pub dosage: Option<String>,
    pub dosage_form: Option<String>,
    pub side_effects: Option<String>,
    pub contraindications: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct MedicineInput {
    pub name: String,
    pub code: String,
    pub category: Option<String>,
    pub specification: String,
    pub unit: String,
    pub price: Decimal,
    pub stock: i64,
    pub manufacturer: Option<String>,
    pub indication: Option<String>,
    pub dosage: Option<String>,
    pub dosage_form: Option<String>,
    pub side_effects: Option<String>,
    pub contraindications: Option<String>,
    pub available: bool,
}

impl MedicineRequest {
    pub fn validate(self) -> Result<MedicineInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", self.name, 2, 50);
        let code = errors.required_text("code", self.code, 1, 20);
        if !code.is_empty() && !MEDICINE_CODE_RE.is_match(&code) {
            errors.add("code", "must be 4-20 upper-case letters or digits");
        }
        let category = errors.optional_text("category", self.category, 0, 20);
        let specification = errors.required_text("specification", self.specification, 1, 30);
        let unit = errors.required_text("unit", self.unit, 1, 10);
        let price = errors.required("price", self.price);
        if let Some(p) = price {
            errors.money("price", p, Decimal::new(1, 2), max_price(), 5);
        }
        let stock = self.stock.unwrap_or(0);
        validate_stock(&mut errors, "stock", stock);
        let manufacturer = errors.optional_text("manufacturer", self.manufacturer, 0, 50);
        let indication = errors.optional_text("indication", self.indication, 0, 500);
        let dosage = errors.optional_text("dosage", self.dosage, 0, 300);
        let dosage_form = errors.optional_text("dosageForm", self.dosage_form, 0, 50);
        let side_effects = errors.optional_text("sideEffects", self.side_effects, 0, 500);
        let contraindications =
            errors.optional_text("contraindications", self.contraindications, 0, 500);

        errors.finish(MedicineInput {
            name,
            code,
            category,
            specification,
            unit,
            price: price.unwrap_or_default(),
            stock,
            manufacturer,
            indication,
            dosage,
            dosage_form,
            side_effects,
            contraindications,
            available: self.available.unwrap_or(true),
        })
    }
}

pub fn validate_stock(errors: &mut FieldErrors, field: &str, quantity: i64) {
    errors.range_i64(field, quantity, 0, MAX_STOCK);
}

fn max_price() -> Decimal {
    Decimal::from_str("99999.99").unwrap_or(Decimal::MAX)
}

/// Result of seeding the built-in medicine catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueImport {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
}
