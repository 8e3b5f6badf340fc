//! Patient records.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

pub fn create_patient(conn: &mut Connection, req: PatientRequest) -> ServiceResult<Patient> {
    let now = db::local_now();
    let input = req.validate(now.date())?;
    let tx = conn.transaction()?;
    if db::exists_patient_by_id_card(&tx, &input.id_card, None)? {
        return Err(id_card_taken(&input.id_card));
    }
    let id = db::insert_patient(&tx, &input, now)?;
    let patient = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(patient_id = id, "Patient created");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: i64) -> ServiceResult<Patient> {
    load(conn, id)
}

pub fn get_patient_by_id_card(conn: &Connection, id_card: &str) -> ServiceResult<Patient> {
    let id_card = id_card.trim();
    db::find_patient_by_id_card(conn, id_card)?
        .ok_or_else(|| ServiceError::not_found("Patient", id_card))
}

pub fn update_patient(conn: &mut Connection, id: i64, req: PatientRequest) -> ServiceResult<Patient> {
    let now = db::local_now();
    let input = req.validate(now.date())?;
    let tx = conn.transaction()?;
    let existing = load(&tx, id)?;
    if existing.id_card != input.id_card
        && db::exists_patient_by_id_card(&tx, &input.id_card, Some(id))?
    {
        return Err(id_card_taken(&input.id_card));
    }
    db::update_patient(&tx, id, &input, now)?;
    let patient = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(patient_id = id, "Patient updated");
    Ok(patient)
}

pub fn delete_patient(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_patient(&tx, id)?;
    tx.commit()?;
    tracing::info!(patient_id = id, "Patient deleted");
    Ok(())
}

pub fn list_patients(conn: &Connection, page: &PageRequest) -> ServiceResult<PageResponse<Patient>> {
    Ok(db::find_patient_page(conn, page)?)
}

/// Keyword search across name, id card and phone. Each patient appears once,
/// newest first. A blank keyword matches nothing.
pub fn search_patients(conn: &Connection, keyword: &str) -> ServiceResult<Vec<Patient>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }

    let by_name = db::search_patients_by_name(conn, keyword)?;
    let by_id_card = db::search_patients_by_id_card(conn, keyword)?;
    let by_phone = db::search_patients_by_phone(conn, keyword)?;
    tracing::debug!(
        name_hits = by_name.len(),
        id_card_hits = by_id_card.len(),
        phone_hits = by_phone.len(),
        "Patient search"
    );

    let mut seen = HashSet::new();
    let mut merged: Vec<Patient> = by_name
        .into_iter()
        .chain(by_id_card)
        .chain(by_phone)
        .filter(|p| seen.insert(p.id))
        .collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(merged)
}

pub fn search_patients_by_name(conn: &Connection, name: &str) -> ServiceResult<Vec<Patient>> {
    Ok(db::search_patients_by_name(conn, name.trim())?)
}

fn load(conn: &Connection, id: i64) -> ServiceResult<Patient> {
    db::find_patient_by_id(conn, id)?.ok_or_else(|| ServiceError::not_found("Patient", id))
}

fn id_card_taken(id_card: &str) -> ServiceError {
    ServiceError::Conflict(format!("ID card already exists: {id_card}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::NaiveDate;

    pub(crate) fn patient_request(name: &str, id_card: &str) -> PatientRequest {
        PatientRequest {
            name: Some(name.into()),
            gender: Some(Gender::Female),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            id_card: Some(id_card.into()),
            phone: Some("13800138000".into()),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_id_card_is_conflict() {
        let mut conn = open_memory_database().unwrap();
        create_patient(&mut conn, patient_request("Li Na", "110105199005170022")).unwrap();
        let err =
            create_patient(&mut conn, patient_request("Li Na2", "110105199005170022")).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let other = create_patient(&mut conn, patient_request("Zhao Min", "110105199005170030")).unwrap();
        let found = get_patient_by_id_card(&conn, "110105199005170030").unwrap();
        assert_eq!(found.id, other.id);
    }

    #[test]
    fn update_keeping_own_id_card_is_allowed() {
        let mut conn = open_memory_database().unwrap();
        let patient =
            create_patient(&mut conn, patient_request("Li Na", "110105199005170022")).unwrap();
        let mut req = patient_request("Li Na Updated", "110105199005170022");
        req.allergies = Some("penicillin".into());
        let updated = update_patient(&mut conn, patient.id, req).unwrap();
        assert_eq!(updated.name, "Li Na Updated");
        assert_eq!(updated.allergies.as_deref(), Some("penicillin"));
        assert_eq!(updated.created_at, patient.created_at);
    }

    #[test]
    fn update_to_other_id_card_is_conflict() {
        let mut conn = open_memory_database().unwrap();
        create_patient(&mut conn, patient_request("Li Na", "110105199005170022")).unwrap();
        let second =
            create_patient(&mut conn, patient_request("Zhao Min", "110105199005170030")).unwrap();
        let err = update_patient(
            &mut conn,
            second.id,
            patient_request("Zhao Min", "110105199005170022"),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn search_by_exact_id_card_returns_one_hit() {
        let mut conn = open_memory_database().unwrap();
        let patient =
            create_patient(&mut conn, patient_request("Li Na", "110105199005170022")).unwrap();
        create_patient(&mut conn, patient_request("Zhao Min", "110105199005170030")).unwrap();

        let hits = search_patients(&conn, "110105199005170022").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, patient.id);
    }

    #[test]
    fn search_merges_without_duplicates() {
        let mut conn = open_memory_database().unwrap();
        create_patient(&mut conn, patient_request("Li Na", "110105199005170022")).unwrap();
        create_patient(&mut conn, patient_request("Zhao Min", "110105199005170030")).unwrap();
        // Both share the phone number.
        let hits = search_patients(&conn, "138").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].id > hits[1].id);

        assert!(search_patients(&conn, "   ").unwrap().is_empty());
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let mut conn = open_memory_database().unwrap();
        let mut req = patient_request("Li Na", "110105199005170022");
        req.birth_date = Some(db::local_now().date() + chrono::Duration::days(1));
        match create_patient(&mut conn, req).unwrap_err() {
            ServiceError::Validation(errors) => assert!(errors.get("birthDate").is_some()),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn list_pages_with_total() {
        let mut conn = open_memory_database().unwrap();
        for i in 0..12 {
            create_patient(
                &mut conn,
                patient_request(&format!("Patient {i}"), &format!("1101051990051700{:02}", i)),
            )
            .unwrap();
        }
        let page = list_patients(&conn, &PageRequest::new(0, 10)).unwrap();
        assert_eq!(page.content.len(), 10);
        assert_eq!(page.total_elements, 12);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        assert!(matches!(
            delete_patient(&mut conn, 9),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn name_search_is_substring_only() {
        let mut conn = open_memory_database().unwrap();
        create_patient(&mut conn, patient_request("Li Na", "110105199005170022")).unwrap();
        create_patient(&mut conn, patient_request("Zhao Min", "110105199005170030")).unwrap();
        let hits = search_patients_by_name(&conn, " Na ").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Li Na");
        assert!(search_patients_by_name(&conn, "138").unwrap().is_empty());
    }
}
