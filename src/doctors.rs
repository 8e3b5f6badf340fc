//! Doctor roster.

use rusqlite::Connection;

use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::models::*;

pub fn create_doctor(conn: &mut Connection, req: DoctorRequest) -> ServiceResult<Doctor> {
    let input = req.validate()?;
    let tx = conn.transaction()?;
    let id = db::insert_doctor(&tx, &input, db::local_now())?;
    let doctor = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(doctor_id = id, department = %doctor.department, "Doctor created");
    Ok(doctor)
}

pub fn get_doctor(conn: &Connection, id: i64) -> ServiceResult<Doctor> {
    load(conn, id)
}

pub fn update_doctor(conn: &mut Connection, id: i64, req: DoctorRequest) -> ServiceResult<Doctor> {
    let input = req.validate()?;
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::update_doctor(&tx, id, &input, db::local_now())?;
    let doctor = load(&tx, id)?;
    tx.commit()?;
    tracing::info!(doctor_id = id, "Doctor updated");
    Ok(doctor)
}

pub fn delete_doctor(conn: &mut Connection, id: i64) -> ServiceResult<()> {
    let tx = conn.transaction()?;
    load(&tx, id)?;
    db::delete_doctor(&tx, id)?;
    tx.commit()?;
    tracing::info!(doctor_id = id, "Doctor deleted");
    Ok(())
}

pub fn list_doctors(conn: &Connection, page: &PageRequest) -> ServiceResult<PageResponse<Doctor>> {
    Ok(db::find_doctor_page(conn, page)?)
}

pub fn search_doctors(conn: &Connection, name: &str) -> ServiceResult<Vec<Doctor>> {
    Ok(db::search_doctors_by_name(conn, name.trim())?)
}

pub fn doctors_by_department(conn: &Connection, department: &str) -> ServiceResult<Vec<Doctor>> {
    Ok(db::find_doctors_by_department(conn, department.trim())?)
}

pub fn departments(conn: &Connection) -> ServiceResult<Vec<String>> {
    Ok(db::find_departments(conn)?)
}

pub fn available_doctors(conn: &Connection) -> ServiceResult<Vec<Doctor>> {
    Ok(db::find_available_doctors(conn)?)
}

fn load(conn: &Connection, id: i64) -> ServiceResult<Doctor> {
    db::find_doctor_by_id(conn, id)?.ok_or_else(|| ServiceError::not_found("Doctor", id))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use rust_decimal::Decimal;

    pub(crate) fn doctor_request(name: &str, department: &str) -> DoctorRequest {
        DoctorRequest {
            name: Some(name.into()),
            gender: Some(Gender::Male),
            department: Some(department.into()),
            title: Some("Attending".into()),
            consultation_fee: Some(Decimal::new(5000, 2)),
            ..Default::default()
        }
    }

    #[test]
    fn create_defaults_to_available() {
        let mut conn = open_memory_database().unwrap();
        let doctor = create_doctor(&mut conn, doctor_request("Dr Chen", "Cardiology")).unwrap();
        assert!(doctor.available);
        assert_eq!(doctor.consultation_fee, Some(Decimal::new(5000, 2)));
        assert_eq!(get_doctor(&conn, doctor.id).unwrap().name, "Dr Chen");
    }

    #[test]
    fn fee_bounds_are_validated() {
        let mut conn = open_memory_database().unwrap();
        let mut req = doctor_request("Dr Chen", "Cardiology");
        req.consultation_fee = Some(Decimal::new(1_000_000, 2));
        assert!(matches!(
            create_doctor(&mut conn, req),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn departments_are_distinct_and_sorted() {
        let mut conn = open_memory_database().unwrap();
        create_doctor(&mut conn, doctor_request("Dr Chen", "Surgery")).unwrap();
        create_doctor(&mut conn, doctor_request("Dr Wu", "Cardiology")).unwrap();
        create_doctor(&mut conn, doctor_request("Dr Li", "Surgery")).unwrap();
        assert_eq!(departments(&conn).unwrap(), vec!["Cardiology", "Surgery"]);
        assert_eq!(doctors_by_department(&conn, "Surgery").unwrap().len(), 2);
    }

    #[test]
    fn unavailable_doctors_are_filtered() {
        let mut conn = open_memory_database().unwrap();
        let doctor = create_doctor(&mut conn, doctor_request("Dr Chen", "Surgery")).unwrap();
        create_doctor(&mut conn, doctor_request("Dr Wu", "Surgery")).unwrap();
        let mut req = doctor_request("Dr Chen", "Surgery");
        req.available = Some(false);
        update_doctor(&mut conn, doctor.id, req).unwrap();

        let available = available_doctors(&conn).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Dr Wu");
    }

    #[test]
    fn search_is_substring() {
        let mut conn = open_memory_database().unwrap();
        create_doctor(&mut conn, doctor_request("Dr Chen", "Surgery")).unwrap();
        create_doctor(&mut conn, doctor_request("Dr Wu", "Surgery")).unwrap();
        assert_eq!(search_doctors(&conn, "che").unwrap().len(), 1);
    }

    #[test]
    fn update_missing_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        assert!(matches!(
            update_doctor(&mut conn, 3, doctor_request("Dr Chen", "Surgery")),
            Err(ServiceError::NotFound { .. })
        ));
    }
}
