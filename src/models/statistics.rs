use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use super::enums::{FeedbackStatus, PaymentStatus, RegistrationStatus};

/// Registration count and fee revenue for one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStats {
    pub department: String,
    pub registration_count: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusTotal {
    pub status: PaymentStatus,
    pub count: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_patients: i64,
    pub total_doctors: i64,
    pub total_registrations: i64,
    pub total_revenue: Decimal,
    pub registration_status_stats: BTreeMap<RegistrationStatus, i64>,
    pub payment_status_stats: BTreeMap<PaymentStatus, i64>,
    pub top_departments: Vec<DepartmentStats>,
}

/// Cumulative figures from midnight up to each label's hour.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub labels: Vec<String>,
    pub registration_data: Vec<i64>,
    pub revenue_data: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDayStats {
    pub date: NaiveDate,
    pub total: i64,
    pub status_counts: BTreeMap<RegistrationStatus, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDayStats {
    pub date: NaiveDate,
    pub statuses: Vec<PaymentStatusTotal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStatistics {
    pub status_stats: BTreeMap<FeedbackStatus, i64>,
    pub type_stats: BTreeMap<String, i64>,
    pub total_count: i64,
    pub today_count: i64,
}
