//! Medicine catalogue and stock.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

/// Stock level at or below which an item counts as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

pub fn create_medicine(conn: &mut Connection, req: MedicineRequest) -> ServiceResult<Medicine> {
    let input = req.validate()?;
    let tx = conn.transaction()?;
    if db::exists_medicine_by_code(&tx, &input.code, None)? {
        return Err(code_taken(&input.code));
    }
    let id = db::insert_medicine(&tx, &input, db::local_now())?;
    let medicine = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(medicine_id = id, code = %medicine.code, "Medicine created");
    Ok(medicine)
}

pub fn get_medicine(conn: &Connection, id: i64) -> ServiceResult<Medicine> {
    load(conn, id)
}

pub fn get_medicine_by_code(conn: &Connection, code: &str) -> ServiceResult<Medicine> {
    let code = code.trim();
    db::find_medicine_by_code(conn, code)?.ok_or_else(|| ServiceError::not_found("Medicine", code))
}

pub fn update_medicine(
    conn: &mut Connection,
    id: i64,
    req: MedicineRequest,
) -> ServiceResult<Medicine> {
    let input = req.validate()?;
    let tx = conn.transaction()?;
    let existing = load(&tx, id)?;
    if existing.code != input.code && db::exists_medicine_by_code(&tx, &input.code, Some(id))? {
        return Err(code_taken(&input.code));
    }
    db::update_medicine(&tx, id, &input, db::local_now())?;
    let medicine = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(medicine_id = id, "Medicine updated");
    Ok(medicine)
}

pub fn delete_medicine(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_medicine(&tx, id)?;
    tx.commit()?;
    tracing::info!(medicine_id = id, "Medicine deleted");
    Ok(())
}

pub fn list_medicines(
    conn: &Connection,
    page: &PageRequest,
    category: Option<&str>,
) -> ServiceResult<PageResponse<Medicine>> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    Ok(db::find_medicine_page(conn, page, category)?)
}

pub fn search_medicines(conn: &Connection, name: &str) -> ServiceResult<Vec<Medicine>> {
    Ok(db::search_medicines_by_name(conn, name.trim())?)
}

pub fn low_stock_medicines(conn: &Connection, threshold: i64) -> ServiceResult<Vec<Medicine>> {
    Ok(db::find_low_stock_medicines(conn, threshold)?)
}

/// Overwrite the stock level. Zero is a valid level.
pub fn update_stock(conn: &mut Connection, id: i64, quantity: i64) -> ServiceResult<Medicine> {
    let mut errors = FieldErrors::new();
    validate_stock(&mut errors, "quantity", quantity);
    errors.finish(())?;

    let tx = conn.transaction()?;
    let before = load(&tx, id)?;
    db::set_medicine_stock(&tx, id, quantity, db::local_now())?;
    let medicine = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(medicine_id = id, from = before.stock, to = quantity, "Stock updated");
    Ok(medicine)
}

/// Insert every built-in catalogue entry whose code is not taken yet.
pub fn init_common_medicines(conn: &mut Connection) -> ServiceResult<CatalogueImport> {
    let tx = conn.transaction()?;
    let now = db::local_now();
    let mut added = 0;
    let mut skipped = 0;
    for entry in COMMON_MEDICINES {
        if db::exists_medicine_by_code(&tx, entry.code, None)? {
            tracing::debug!(code = entry.code, "Catalogue entry exists, skipping");
            skipped += 1;
            continue;
        }
        db::insert_medicine(&tx, &entry.to_input(), now)?;
        added += 1;
    }
    tx.commit()?;

    let report = CatalogueImport {
        added,
        skipped,
        total: COMMON_MEDICINES.len(),
    };
    tracing::info!(added, skipped, total = report.total, "Common medicines initialized");
    Ok(report)
}

fn load(conn: &Connection, id: i64) -> ServiceResult<Medicine> {
    db::find_medicine_by_id(conn, id)?.ok_or_else(|| ServiceError::not_found("Medicine", id))
}

fn code_taken(code: &str) -> ServiceError {
    ServiceError::Conflict(format!("Medicine code already exists: {code}"))
}

struct CommonMedicine {
    name: &'static str,
    code: &'static str,
    category: &'static str,
    specification: &'static str,
    unit: &'static str,
    price_cents: i64,
    stock: i64,
    manufacturer: &'static str,
    indication: &'static str,
    dosage: &'static str,
    side_effects: &'static str,
    contraindications: &'static str,
}

impl CommonMedicine {
    fn to_input(&self) -> MedicineInput {
        MedicineInput {
            name: self.name.to_string(),
            code: self.code.to_string(),
            category: Some(self.category.to_string()),
            specification: self.specification.to_string(),
            unit: self.unit.to_string(),
            price: Decimal::new(self.price_cents, 2),
            stock: self.stock,
            manufacturer: Some(self.manufacturer.to_string()),
            indication: Some(self.indication.to_string()),
            dosage: Some(self.dosage.to_string()),
            dosage_form: None,
            side_effects: Some(self.side_effects.to_string()),
            contraindications: Some(self.contraindications.to_string()),
            available: true,
        }
    }
}

const COMMON_MEDICINES: &[CommonMedicine] = &[
    CommonMedicine {
        name: "Cold Relief Granules",
        code: "GML001",
        category: "Cold",
        specification: "10g per sachet",
        unit: "sachet",
        price_cents: 1550,
        stock: 200,
        manufacturer: "China Resources Sanjiu",
        indication: "Headache, fever, nasal congestion and sore throat from common cold",
        dosage: "Dissolve one sachet in hot water, three times daily",
        side_effects: "Occasional drowsiness or dry mouth",
        contraindications: "Severe hepatic or renal impairment",
    },
    CommonMedicine {
        name: "Lianhua Qingwen Capsules",
        code: "LHQW001",
        category: "Cold",
        specification: "0.35g",
        unit: "capsule",
        price_cents: 2800,
        stock: 150,
        manufacturer: "Yiling Pharmaceutical",
        indication: "Influenza with fever and cough",
        dosage: "Four capsules, three times daily",
        side_effects: "Occasional gastrointestinal discomfort",
        contraindications: "Use with caution in pregnancy",
    },
    CommonMedicine {
        name: "Amoxicillin Capsules",
        code: "AMX001",
        category: "Antibiotic",
        specification: "0.25g",
        unit: "capsule",
        price_cents: 1850,
        stock: 500,
        manufacturer: "North China Pharmaceutical",
        indication: "Infections caused by susceptible bacteria",
        dosage: "Adults 0.5g every 6 to 8 hours",
        side_effects: "Allergic reactions, gastrointestinal upset",
        contraindications: "Penicillin allergy",
    },
    CommonMedicine {
        name: "Cefixime Capsules",
        code: "TBK001",
        category: "Antibiotic",
        specification: "0.1g",
        unit: "capsule",
        price_cents: 2560,
        stock: 400,
        manufacturer: "Qilu Pharmaceutical",
        indication: "Infections caused by susceptible bacteria",
        dosage: "Adults 0.2g twice daily",
        side_effects: "Diarrhoea, nausea",
        contraindications: "Cephalosporin allergy",
    },
    CommonMedicine {
        name: "Ibuprofen Sustained Release Capsules",
        code: "BLF001",
        category: "Analgesic",
        specification: "0.3g",
        unit: "capsule",
        price_cents: 1680,
        stock: 400,
        manufacturer: "Tianjin Smith Kline",
        indication: "Mild to moderate pain and fever",
        dosage: "One capsule twice daily",
        side_effects: "Stomach upset, dizziness",
        contraindications: "Active peptic ulcer",
    },
    CommonMedicine {
        name: "Paracetamol Tablets",
        code: "PCM001",
        category: "Analgesic",
        specification: "0.5g",
        unit: "tablet",
        price_cents: 850,
        stock: 600,
        manufacturer: "Shanghai Johnson",
        indication: "Fever and mild pain",
        dosage: "One tablet every 4 to 6 hours, at most four daily",
        side_effects: "Rare skin rash",
        contraindications: "Severe hepatic impairment",
    },
    CommonMedicine {
        name: "Omeprazole Enteric Capsules",
        code: "AMLZ001",
        category: "Digestive",
        specification: "20mg",
        unit: "capsule",
        price_cents: 3200,
        stock: 250,
        manufacturer: "AstraZeneca",
        indication: "Gastric and duodenal ulcers, reflux oesophagitis",
        dosage: "One capsule each morning",
        side_effects: "Headache, diarrhoea",
        contraindications: "Hypersensitivity to omeprazole",
    },
    CommonMedicine {
        name: "Montmorillonite Powder",
        code: "MTS001",
        category: "Digestive",
        specification: "3g per sachet",
        unit: "sachet",
        price_cents: 1420,
        stock: 300,
        manufacturer: "Ipsen",
        indication: "Acute and chronic diarrhoea",
        dosage: "One sachet three times daily",
        side_effects: "Occasional constipation",
        contraindications: "None known",
    },
    CommonMedicine {
        name: "Amlodipine Besylate Tablets",
        code: "ALDP001",
        category: "Cardiovascular",
        specification: "5mg",
        unit: "tablet",
        price_cents: 2650,
        stock: 300,
        manufacturer: "Pfizer",
        indication: "Hypertension and stable angina",
        dosage: "5mg once daily",
        side_effects: "Ankle swelling, flushing",
        contraindications: "Severe hypotension",
    },
    CommonMedicine {
        name: "Metformin Hydrochloride Tablets",
        code: "EJSG001",
        category: "Endocrine",
        specification: "0.5g",
        unit: "tablet",
        price_cents: 1960,
        stock: 350,
        manufacturer: "Sino-American Shanghai Squibb",
        indication: "Type 2 diabetes",
        dosage: "0.5g two to three times daily with meals",
        side_effects: "Nausea, abdominal discomfort",
        contraindications: "Renal impairment, metabolic acidosis",
    },
];
