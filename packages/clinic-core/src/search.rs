//! List filtering, search and sort
//!
//! Every function here is pure: the same collection and query always give
//! the same result, and sorts are stable.

use std::cmp::Ordering;

use chrono::NaiveDate;
use clinic_db::models::{Appointment, AppointmentStatus, Bill, BillStatus, Patient};
use serde::{Deserialize, Serialize};

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientSort {
    /// Last name, then first name, A to Z
    #[default]
    Name,
    /// Newest registration first
    RegistrationDate,
    /// Most recent visit first, never-seen patients last
    LastVisit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQuery {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub sort: PatientSort,
}

impl PatientQuery {
    pub fn matches(&self, patient: &Patient) -> bool {
        let term = self.term.trim();
        if term.is_empty() {
            return true;
        }
        let lower = term.to_lowercase();
        contains_ignore_case(&patient.first_name, &lower)
            || contains_ignore_case(&patient.last_name, &lower)
            || contains_ignore_case(&patient.email, &lower)
            || patient.phone.contains(term)
    }
}

pub fn search_patients<'a>(patients: &'a [Patient], query: &PatientQuery) -> Vec<&'a Patient> {
    let mut found: Vec<&Patient> = patients.iter().filter(|p| query.matches(p)).collect();
    match query.sort {
        PatientSort::Name => found.sort_by(|a, b| {
            a.last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
        }),
        PatientSort::RegistrationDate => {
            found.sort_by(|a, b| b.registration_date.cmp(&a.registration_date))
        }
        PatientSort::LastVisit => found.sort_by(|a, b| match (a.last_visit, b.last_visit) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
    found
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    /// Matched against patient and doctor names
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl AppointmentQuery {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.status.map_or(false, |status| status != appointment.status) {
            return false;
        }
        if self.date.map_or(false, |date| date != appointment.appointment_date) {
            return false;
        }
        let term = self.term.trim().to_lowercase();
        term.is_empty()
            || contains_ignore_case(&appointment.patient_name, &term)
            || contains_ignore_case(&appointment.doctor_name, &term)
    }
}

/// Matching appointments by date then start time
pub fn search_appointments<'a>(
    appointments: &'a [Appointment],
    query: &AppointmentQuery,
) -> Vec<&'a Appointment> {
    let mut found: Vec<&Appointment> = appointments.iter().filter(|a| query.matches(a)).collect();
    found.sort_by_key(|a| (a.appointment_date, a.start_time));
    found
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillQuery {
    /// Matched against patient name and bill number
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub status: Option<BillStatus>,
}

impl BillQuery {
    pub fn matches(&self, bill: &Bill) -> bool {
        if self.status.map_or(false, |status| status != bill.status) {
            return false;
        }
        let term = self.term.trim().to_lowercase();
        term.is_empty()
            || contains_ignore_case(&bill.patient_name, &term)
            || contains_ignore_case(&bill.bill_number, &term)
    }
}

/// Matching bills, most recently issued first
pub fn search_bills<'a>(bills: &'a [Bill], query: &BillQuery) -> Vec<&'a Bill> {
    let mut found: Vec<&Bill> = bills.iter().filter(|b| query.matches(b)).collect();
    found.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
    found
}
