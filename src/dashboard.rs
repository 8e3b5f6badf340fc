//! Dashboard figures.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;

use crate::db::{self, TimeWindow};
use crate::error::ServiceResult;
use crate::models::{DashboardSummary, TimeSeries};

/// Departments shown in the summary.
const TOP_DEPARTMENT_LIMIT: u32 = 1;

/// Hour marks of the intraday chart, 08:00 to 18:00 every two hours.
const SERIES_HOURS: [u32; 6] = [8, 10, 12, 14, 16, 18];

pub fn summary(conn: &Connection) -> ServiceResult<DashboardSummary> {
    Ok(DashboardSummary {
        total_patients: db::count_patients(conn)?,
        total_doctors: db::count_doctors(conn)?,
        total_registrations: db::count_registrations(conn)?,
        total_revenue: db::sum_paid_amount(conn)?,
        registration_status_stats: db::registration_status_counts(conn, None)?,
        payment_status_stats: db::payment_status_counts(conn)?,
        top_departments: db::department_stats(conn, TOP_DEPARTMENT_LIMIT)?,
    })
}

/// Running totals for `day`: registrations created and PAID revenue (by
/// payment creation time) from midnight up to each hour mark, inclusive.
pub fn today_time_series(conn: &Connection, day: NaiveDate) -> ServiceResult<TimeSeries> {
    let midnight = day.and_time(NaiveTime::MIN);
    let mut series = TimeSeries {
        labels: Vec::with_capacity(SERIES_HOURS.len()),
        registration_data: Vec::with_capacity(SERIES_HOURS.len()),
        revenue_data: Vec::with_capacity(SERIES_HOURS.len()),
    };
    for hour in SERIES_HOURS {
        let mark = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let window = TimeWindow::new(midnight, day.and_time(mark));
        series.labels.push(format!("{hour:02}:00"));
        series
            .registration_data
            .push(db::count_registrations_created_in(conn, window)?);
        series
            .revenue_data
            .push(db::sum_paid_amount_created_in(conn, window)?);
    }
    Ok(series)
}
