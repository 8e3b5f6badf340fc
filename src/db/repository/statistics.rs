//! Aggregate queries for the dashboard and the per-entity statistics endpoints.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use super::{fmt_ts, from_cents, query_all};
use crate::db::DatabaseError;
use crate::models::*;

/// Inclusive timestamp range, matched with SQL `BETWEEN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Midnight through 23:59:59 of `day`.
    pub fn whole_day(day: NaiveDate) -> Self {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Self {
            start: day.and_time(NaiveTime::MIN),
            end: day.and_time(end),
        }
    }

    fn bounds(&self) -> (String, String) {
        (fmt_ts(&self.start), fmt_ts(&self.end))
    }
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?)
}

pub fn count_registrations(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))?)
}

pub fn count_registrations_created_in(
    conn: &Connection,
    window: TimeWindow,
) -> Result<i64, DatabaseError> {
    let (start, end) = window.bounds();
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM registrations WHERE created_at BETWEEN ?1 AND ?2",
        params![start, end],
        |row| row.get(0),
    )?)
}

/// Sum of every PAID payment's amount; zero when there are none.
pub fn sum_paid_amount(conn: &Connection) -> Result<Decimal, DatabaseError> {
    let cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE status = ?1",
        params![PaymentStatus::Paid.as_str()],
        |row| row.get(0),
    )?;
    Ok(from_cents(cents))
}

/// PAID amounts for payments created inside `window`.
pub fn sum_paid_amount_created_in(
    conn: &Connection,
    window: TimeWindow,
) -> Result<Decimal, DatabaseError> {
    let (start, end) = window.bounds();
    let cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments
         WHERE status = ?1 AND created_at BETWEEN ?2 AND ?3",
        params![PaymentStatus::Paid.as_str(), start, end],
        |row| row.get(0),
    )?;
    Ok(from_cents(cents))
}

/// Amounts whose `paid_at` falls inside `window`, whatever the current status.
pub fn sum_amount_paid_in(conn: &Connection, window: TimeWindow) -> Result<Decimal, DatabaseError> {
    let (start, end) = window.bounds();
    let cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE paid_at BETWEEN ?1 AND ?2",
        params![start, end],
        |row| row.get(0),
    )?;
    Ok(from_cents(cents))
}

/// Count per registration status, every status present. `window` limits by creation time.
pub fn registration_status_counts(
    conn: &Connection,
    window: Option<TimeWindow>,
) -> Result<BTreeMap<RegistrationStatus, i64>, DatabaseError> {
    let (start, end) = window.map(|w| w.bounds()).unzip();
    let rows = query_all(
        conn,
        "SELECT status, COUNT(*) FROM registrations
         WHERE (?1 IS NULL OR created_at BETWEEN ?1 AND ?2)
         GROUP BY status",
        params![start, end],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        |(status, count)| Ok((RegistrationStatus::from_str(&status)?, count)),
    )?;
    let mut counts: BTreeMap<RegistrationStatus, i64> =
        RegistrationStatus::ALL.iter().map(|s| (*s, 0)).collect();
    counts.extend(rows);
    Ok(counts)
}

pub fn payment_status_counts(
    conn: &Connection,
) -> Result<BTreeMap<PaymentStatus, i64>, DatabaseError> {
    let mut counts: BTreeMap<PaymentStatus, i64> =
        PaymentStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for total in payment_status_totals(conn, None)? {
        counts.insert(total.status, total.count);
    }
    Ok(counts)
}

/// Count and amount per payment status that has rows. `window` limits by creation time.
pub fn payment_status_totals(
    conn: &Connection,
    window: Option<TimeWindow>,
) -> Result<Vec<PaymentStatusTotal>, DatabaseError> {
    let (start, end) = window.map(|w| w.bounds()).unzip();
    query_all(
        conn,
        "SELECT status, COUNT(*), COALESCE(SUM(amount_cents), 0) FROM payments
         WHERE (?1 IS NULL OR created_at BETWEEN ?1 AND ?2)
         GROUP BY status ORDER BY status",
        params![start, end],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
        |(status, count, cents)| {
            Ok(PaymentStatusTotal {
                status: PaymentStatus::from_str(&status)?,
                count,
                amount: from_cents(cents),
            })
        },
    )
}

/// Registrations and fee revenue per doctor department, busiest first.
pub fn department_stats(conn: &Connection, limit: u32) -> Result<Vec<DepartmentStats>, DatabaseError> {
    query_all(
        conn,
        "SELECT d.department, COUNT(r.id), COALESCE(SUM(r.registration_fee_cents), 0)
         FROM registrations r JOIN doctors d ON d.id = r.doctor_id
         GROUP BY d.department
         ORDER BY COUNT(r.id) DESC, d.department ASC
         LIMIT ?1",
        params![limit],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
        |(department, registration_count, cents)| {
            Ok(DepartmentStats {
                department,
                registration_count,
                revenue: from_cents(cents),
            })
        },
    )
}

pub fn feedback_status_counts(
    conn: &Connection,
) -> Result<BTreeMap<FeedbackStatus, i64>, DatabaseError> {
    let rows = query_all(
        conn,
        "SELECT status, COUNT(*) FROM feedbacks GROUP BY status",
        params![],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        |(status, count)| Ok((FeedbackStatus::from_str(&status)?, count)),
    )?;
    let mut counts: BTreeMap<FeedbackStatus, i64> =
        FeedbackStatus::ALL.iter().map(|s| (*s, 0)).collect();
    counts.extend(rows);
    Ok(counts)
}

pub fn feedback_type_counts(conn: &Connection) -> Result<BTreeMap<String, i64>, DatabaseError> {
    let rows = query_all(
        conn,
        "SELECT feedback_type, COUNT(*) FROM feedbacks GROUP BY feedback_type",
        params![],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        Ok,
    )?;
    Ok(rows.into_iter().collect())
}

pub fn count_feedback(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM feedbacks", [], |row| row.get(0))?)
}

pub fn count_feedback_created_in(conn: &Connection, window: TimeWindow) -> Result<i64, DatabaseError> {
    let (start, end) = window.bounds();
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM feedbacks WHERE created_at BETWEEN ?1 AND ?2",
        params![start, end],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Duration;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 8)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn patient(conn: &Connection) -> i64 {
        insert_patient(
            conn,
            &PatientInput {
                name: "Stat Patient".into(),
                gender: Gender::Male,
                birth_date: NaiveDate::from_ymd_opt(1960, 1, 1).unwrap(),
                id_card: "110105196001010011".into(),
                phone: None,
                address: None,
                email: None,
                emergency_contact: None,
                emergency_phone: None,
                medical_history: None,
                allergies: None,
            },
            at(7, 0),
        )
        .unwrap()
    }

    fn doctor(conn: &Connection, department: &str) -> i64 {
        insert_doctor(
            conn,
            &DoctorInput {
                name: "Dr Stat".into(),
                gender: Gender::Female,
                department: department.into(),
                title: "Chief".into(),
                phone: None,
                email: None,
                specialization: None,
                introduction: None,
                consultation_fee: None,
                available: true,
            },
            at(7, 0),
        )
        .unwrap()
    }

    fn register(conn: &Connection, patient_id: i64, doctor_id: i64, cents: i64, created: NaiveDateTime) {
        let fields = RegistrationInput {
            patient_id: None,
            doctor_id: None,
            appointment_time: created + Duration::hours(1),
            registration_fee: from_cents(cents),
            status: None,
            symptoms: None,
            diagnosis: None,
            treatment: None,
            prescription: None,
            notes: None,
        };
        insert_registration(
            conn,
            &NewRegistration { patient_id, doctor_id, status: RegistrationStatus::Pending, fields: &fields },
            created,
        )
        .unwrap();
    }

    fn pay(conn: &Connection, patient_id: i64, cents: i64, created: NaiveDateTime, paid: bool) -> i64 {
        let fields = PaymentInput {
            patient_id: None,
            registration_id: None,
            medicine_id: None,
            payment_type: PaymentType::Examination,
            amount: from_cents(cents),
            payment_method: "CASH".into(),
            quantity: 1,
            description: None,
            notes: None,
        };
        let id = insert_payment(
            conn,
            &NewPayment { patient_id, registration_id: None, medicine_id: None, fields: &fields },
            None,
            created,
        )
        .unwrap();
        if paid {
            mark_payment_paid(conn, id, None, created).unwrap();
        }
        id
    }

    #[test]
    fn empty_database_has_zero_revenue_and_full_status_maps() {
        let conn = open_memory_database().unwrap();
        assert_eq!(sum_paid_amount(&conn).unwrap(), Decimal::ZERO);
        let reg = registration_status_counts(&conn, None).unwrap();
        assert_eq!(reg.len(), 4);
        assert!(reg.values().all(|c| *c == 0));
        assert_eq!(payment_status_counts(&conn).unwrap().len(), 3);
        assert_eq!(feedback_status_counts(&conn).unwrap().len(), 3);
    }

    #[test]
    fn paid_sum_ignores_pending_payments() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        pay(&conn, p, 1050, at(9, 0), true);
        pay(&conn, p, 2025, at(9, 30), true);
        pay(&conn, p, 9999, at(10, 0), false);
        assert_eq!(sum_paid_amount(&conn).unwrap(), Decimal::new(3075, 2));

        let morning = TimeWindow::new(at(0, 0), at(9, 15));
        assert_eq!(sum_paid_amount_created_in(&conn, morning).unwrap(), Decimal::new(1050, 2));

        let totals = payment_status_totals(&conn, None).unwrap();
        let paid = totals.iter().find(|t| t.status == PaymentStatus::Paid).unwrap();
        assert_eq!(paid.count, 2);
    }

    #[test]
    fn refunded_payment_still_counts_toward_paid_at_window() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let id = pay(&conn, p, 5000, at(11, 0), true);
        mark_payment_refunded(&conn, id, at(12, 0)).unwrap();
        let day = TimeWindow::whole_day(at(0, 0).date());
        assert_eq!(sum_amount_paid_in(&conn, day).unwrap(), Decimal::new(5000, 2));
        assert_eq!(sum_paid_amount(&conn).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn departments_rank_by_count_then_name() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let cardio = doctor(&conn, "Cardiology");
        let derm = doctor(&conn, "Dermatology");
        let ent = doctor(&conn, "ENT");
        register(&conn, p, derm, 1000, at(8, 0));
        register(&conn, p, derm, 1000, at(8, 5));
        register(&conn, p, cardio, 3000, at(8, 10));
        register(&conn, p, ent, 500, at(8, 15));

        let top = department_stats(&conn, 10).unwrap();
        let names: Vec<&str> = top.iter().map(|d| d.department.as_str()).collect();
        assert_eq!(names, vec!["Dermatology", "Cardiology", "ENT"]);
        assert_eq!(top[0].registration_count, 2);
        assert_eq!(top[0].revenue, Decimal::new(2000, 2));
        assert_eq!(department_stats(&conn, 1).unwrap().len(), 1);
    }

    #[test]
    fn windows_are_inclusive() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn);
        let d = doctor(&conn, "Cardiology");
        register(&conn, p, d, 1000, at(10, 0));
        register(&conn, p, d, 1000, at(10, 1));
        let window = TimeWindow::new(at(0, 0), at(10, 0));
        assert_eq!(count_registrations_created_in(&conn, window).unwrap(), 1);
        let today = registration_status_counts(&conn, Some(TimeWindow::whole_day(at(0, 0).date()))).unwrap();
        assert_eq!(today[&RegistrationStatus::Pending], 2);
    }
}
