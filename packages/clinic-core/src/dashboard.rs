//! Dashboard figures

use chrono::{Datelike, NaiveDate};
use clinic_db::models::{Appointment, Bill, Patient, Payment};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::{compute_balances, top_debtors, total_outstanding, PatientBalance};
use crate::billing::reports::{monthly_revenue, outstanding_amount, overdue_bills, pending_bills};
use crate::schedule::appointments::{on_date, upcoming};

/// Days ahead counted as upcoming on the dashboard
pub const UPCOMING_DAYS: i64 = 7;
/// Number of debtors listed on the dashboard
pub const TOP_DEBTORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: usize,
    pub todays_appointments: usize,
    pub upcoming_appointments: usize,
    pub pending_bills: usize,
    pub overdue_bills: usize,
    /// Unpaid part of sent, overdue and partial bills
    pub outstanding_amount: Decimal,
    /// Paid bill totals for the month of `today`
    pub monthly_revenue: Decimal,
    pub top_debtors: Vec<PatientBalance>,
    /// Sum of every patient balance
    pub total_outstanding: Decimal,
}

impl DashboardStats {
    pub fn compute(
        patients: &[Patient],
        appointments: &[Appointment],
        bills: &[Bill],
        payments: &[Payment],
        today: NaiveDate,
    ) -> Self {
        let balances = compute_balances(patients, bills, payments);

        Self {
            total_patients: patients.len(),
            todays_appointments: on_date(appointments, today).len(),
            upcoming_appointments: upcoming(appointments, today, UPCOMING_DAYS).len(),
            pending_bills: pending_bills(bills).len(),
            overdue_bills: overdue_bills(bills, today).len(),
            outstanding_amount: outstanding_amount(bills, payments),
            monthly_revenue: monthly_revenue(bills, today.year(), today.month()),
            top_debtors: top_debtors(&balances, TOP_DEBTORS).into_iter().cloned().collect(),
            total_outstanding: total_outstanding(&balances),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use chrono::Utc;

    #[test]
    fn sample_dashboard() {
        let now = Utc::now();
        let today = now.date_naive();
        let data = fixtures::SampleData::generate(today, now);

        let stats = DashboardStats::compute(
            &data.patients,
            &data.appointments,
            &data.bills,
            &data.payments,
            today,
        );
        assert_eq!(stats.total_patients, 3);
        assert_eq!(stats.todays_appointments, 3);
        assert_eq!(stats.upcoming_appointments, 5);
        assert_eq!(stats.pending_bills, 2);
        assert_eq!(stats.overdue_bills, 1);
        assert_eq!(stats.outstanding_amount, Decimal::new(1111, 0));
        assert_eq!(stats.monthly_revenue, Decimal::new(162, 0));
        assert_eq!(stats.top_debtors.len(), 2);
        assert_eq!(stats.total_outstanding, Decimal::new(1111, 0));
    }

    #[test]
    fn empty_clinic() {
        let today = Utc::now().date_naive();
        let stats = DashboardStats::compute(&[], &[], &[], &[], today);
        assert_eq!(stats.total_patients, 0);
        assert_eq!(stats.outstanding_amount, Decimal::ZERO);
        assert!(stats.top_debtors.is_empty());
    }
}
