//! Appointment registrations.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::{self, NewRegistration, TimeWindow};
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

pub fn create_registration(
    conn: &mut Connection,
    req: RegistrationRequest,
) -> ServiceResult<RegistrationDetail> {
    let now = db::local_now();
    let input = req.validate_create(now)?;
    let tx = conn.transaction()?;
    let patient_id = resolve_patient(&tx, input.patient_id)?;
    let doctor_id = resolve_doctor(&tx, input.doctor_id)?;

    let new = NewRegistration {
        patient_id,
        doctor_id,
        status: input.status.unwrap_or(RegistrationStatus::Pending),
        fields: &input,
    };
    let id = db::insert_registration(&tx, &new, now)?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(registration_id = id, patient_id, doctor_id, "Registration created");
    Ok(detail)
}

pub fn get_registration(conn: &Connection, id: i64) -> ServiceResult<RegistrationDetail> {
    load(conn, id)
}

/// Replace the editable fields. Patient, doctor and status keep their
/// current values unless the request supplies new ones.
pub fn update_registration(
    conn: &mut Connection,
    id: i64,
    req: RegistrationRequest,
) -> ServiceResult<RegistrationDetail> {
    let input = req.validate_update()?;
    let tx = conn.transaction()?;
    let existing = db::find_registration_by_id(&tx, id)?
        .ok_or_else(|| ServiceError::not_found("Registration", id))?;

    let patient_id = match input.patient_id {
        Some(pid) => resolve_patient(&tx, Some(pid))?,
        None => existing.patient_id,
    };
    let doctor_id = match input.doctor_id {
        Some(did) => resolve_doctor(&tx, Some(did))?,
        None => existing.doctor_id,
    };
    let new = NewRegistration {
        patient_id,
        doctor_id,
        status: input.status.unwrap_or(existing.status),
        fields: &input,
    };
    db::update_registration(&tx, id, &new, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(registration_id = id, "Registration updated");
    Ok(detail)
}

pub fn delete_registration(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_registration(&tx, id)?;
    tx.commit()?;
    tracing::info!(registration_id = id, "Registration deleted");
    Ok(())
}

pub fn list_registrations(
    conn: &Connection,
    page: &PageRequest,
) -> ServiceResult<PageResponse<RegistrationDetail>> {
    Ok(db::find_registration_page(conn, page)?)
}

pub fn registrations_by_patient(
    conn: &Connection,
    patient_id: i64,
) -> ServiceResult<Vec<RegistrationDetail>> {
    Ok(db::find_registrations_by_patient(conn, patient_id)?)
}

pub fn registrations_by_doctor(
    conn: &Connection,
    doctor_id: i64,
) -> ServiceResult<Vec<RegistrationDetail>> {
    Ok(db::find_registrations_by_doctor(conn, doctor_id)?)
}

/// Any status may move to any other.
pub fn update_registration_status(
    conn: &mut Connection,
    id: i64,
    status: RegistrationStatus,
) -> ServiceResult<RegistrationDetail> {
    let tx = conn.transaction()?;
    let before = load(&tx, id)?;
    db::set_registration_status(&tx, id, status, db::local_now())?;
    let detail = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(
        registration_id = id,
        from = %before.registration.status,
        to = %status,
        "Registration status changed"
    );
    Ok(detail)
}

/// Status breakdown of registrations created on `day`.
pub fn registration_day_stats(conn: &Connection, day: NaiveDate) -> ServiceResult<RegistrationDayStats> {
    let window = TimeWindow::whole_day(day);
    let status_counts = db::registration_status_counts(conn, Some(window))?;
    Ok(RegistrationDayStats {
        date: day,
        total: status_counts.values().sum(),
        status_counts,
    })
}

fn load(conn: &Connection, id: i64) -> ServiceResult<RegistrationDetail> {
    db::find_registration_detail(conn, id)?
        .ok_or_else(|| ServiceError::not_found("Registration", id))
}

fn resolve_patient(conn: &Connection, id: Option<i64>) -> ServiceResult<i64> {
    let id = id.ok_or_else(|| ServiceError::field("patientId", "must not be null"))?;
    db::find_patient_by_id(conn, id)?
        .map(|p| p.id)
        .ok_or_else(|| ServiceError::not_found("Patient", id))
}

fn resolve_doctor(conn: &Connection, id: Option<i64>) -> ServiceResult<i64> {
    let id = id.ok_or_else(|| ServiceError::field("doctorId", "must not be null"))?;
    db::find_doctor_by_id(conn, id)?
        .map(|d| d.id)
        .ok_or_else(|| ServiceError::not_found("Doctor", id))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::doctors::{create_doctor, tests::doctor_request};
    use crate::patients::{create_patient, tests::patient_request};
    use rust_decimal::Decimal;

    /// One patient and one doctor; returns their ids.
    pub(crate) fn fixtures(conn: &mut Connection) -> (i64, i64) {
        let patient = create_patient(conn, patient_request("Li Na", "110105199005170022")).unwrap();
        let doctor = create_doctor(conn, doctor_request("Dr Chen", "Cardiology")).unwrap();
        (patient.id, doctor.id)
    }

    pub(crate) fn registration_request(patient_id: i64, doctor_id: i64) -> RegistrationRequest {
        RegistrationRequest {
            patient_id: Some(patient_id),
            doctor_id: Some(doctor_id),
            appointment_time: Some(db::local_now() + chrono::Duration::days(1)),
            registration_fee: Some(Decimal::new(2000, 2)),
            symptoms: Some("chest pain".into()),
            ..Default::default()
        }
    }

    #[test]
    fn doctor_to_completed_round_trip() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = fixtures(&mut conn);

        let created =
            create_registration(&mut conn, registration_request(patient_id, doctor_id)).unwrap();
        assert_eq!(created.registration.status, RegistrationStatus::Pending);
        assert_eq!(created.patient.id, patient_id);
        assert_eq!(created.doctor.name, "Dr Chen");

        let id = created.registration.id;
        update_registration_status(&mut conn, id, RegistrationStatus::Completed).unwrap();
        let fetched = get_registration(&conn, id).unwrap();
        assert_eq!(fetched.registration.status, RegistrationStatus::Completed);
    }

    #[test]
    fn missing_references_are_not_found() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, _) = fixtures(&mut conn);
        let err = create_registration(&mut conn, registration_request(patient_id, 99)).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity, .. } if entity == "Doctor"));
        let err = create_registration(&mut conn, registration_request(77, 1)).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity, .. } if entity == "Patient"));
    }

    #[test]
    fn past_appointment_is_rejected_on_create() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = fixtures(&mut conn);
        let mut req = registration_request(patient_id, doctor_id);
        req.appointment_time = Some(db::local_now() - chrono::Duration::hours(1));
        assert!(matches!(
            create_registration(&mut conn, req),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn update_keeps_references_and_status_when_omitted() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = fixtures(&mut conn);
        let created =
            create_registration(&mut conn, registration_request(patient_id, doctor_id)).unwrap();
        let id = created.registration.id;
        update_registration_status(&mut conn, id, RegistrationStatus::InProgress).unwrap();

        let req = RegistrationRequest {
            appointment_time: Some(db::local_now() + chrono::Duration::days(2)),
            registration_fee: Some(Decimal::new(3000, 2)),
            diagnosis: Some("angina".into()),
            ..Default::default()
        };
        let updated = update_registration(&mut conn, id, req).unwrap();
        assert_eq!(updated.patient.id, patient_id);
        assert_eq!(updated.doctor.id, doctor_id);
        assert_eq!(updated.registration.status, RegistrationStatus::InProgress);
        assert_eq!(updated.registration.registration_fee, Decimal::new(3000, 2));
        assert_eq!(updated.registration.diagnosis.as_deref(), Some("angina"));
    }

    #[test]
    fn referenced_patient_cannot_be_deleted() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = fixtures(&mut conn);
        create_registration(&mut conn, registration_request(patient_id, doctor_id)).unwrap();
        let err = crate::patients::delete_patient(&mut conn, patient_id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn day_stats_cover_every_status() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = fixtures(&mut conn);
        create_registration(&mut conn, registration_request(patient_id, doctor_id)).unwrap();
        let created =
            create_registration(&mut conn, registration_request(patient_id, doctor_id)).unwrap();
        update_registration_status(&mut conn, created.registration.id, RegistrationStatus::Cancelled)
            .unwrap();

        let stats = registration_day_stats(&conn, db::local_now().date()).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.status_counts.len(), RegistrationStatus::ALL.len());
        assert_eq!(stats.status_counts[&RegistrationStatus::Pending], 1);
        assert_eq!(stats.status_counts[&RegistrationStatus::Cancelled], 1);
    }

    #[test]
    fn by_patient_and_by_doctor() {
        let mut conn = open_memory_database().unwrap();
        let (patient_id, doctor_id) = fixtures(&mut conn);
        create_registration(&mut conn, registration_request(patient_id, doctor_id)).unwrap();
        assert_eq!(registrations_by_patient(&conn, patient_id).unwrap().len(), 1);
        assert_eq!(registrations_by_doctor(&conn, doctor_id).unwrap().len(), 1);
        assert!(registrations_by_doctor(&conn, doctor_id + 1).unwrap().is_empty());
    }
}
