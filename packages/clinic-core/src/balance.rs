//! Per-patient balances
//!
//! Balances are never stored. They are recomputed from the patient, bill and
//! payment collections on every call, and the result does not depend on the
//! order of the inputs.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use clinic_db::models::{Appointment, Bill, BillStatus, Patient, Payment, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::reports::paid_by_bill;
use crate::schedule::appointments::next_appointment_for;

/// A payment as listed in a patient's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientBalance {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    /// `total_billed - total_paid`
    pub remaining_balance: Decimal,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub last_bill_date: Option<NaiveDate>,
    /// Newest first
    pub payment_history: Vec<PaymentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPaymentSummary {
    pub patient_id: Uuid,
    pub patient_name: String,
    pub total_outstanding: Decimal,
    /// Unpaid part of sent or overdue bills already past their due date
    pub overdue_amount: Decimal,
    /// Issue date of the latest bill
    pub last_visit_date: Option<NaiveDate>,
    pub next_appointment_date: Option<NaiveDate>,
}

/// One balance per patient, ordered by patient name then id
pub fn compute_balances(
    patients: &[Patient],
    bills: &[Bill],
    payments: &[Payment],
) -> Vec<PatientBalance> {
    let mut bills_by_patient: HashMap<Uuid, Vec<&Bill>> = HashMap::new();
    for bill in bills {
        bills_by_patient.entry(bill.patient_id).or_default().push(bill);
    }
    let mut payments_by_bill: HashMap<Uuid, Vec<&Payment>> = HashMap::new();
    for payment in payments {
        payments_by_bill.entry(payment.bill_id).or_default().push(payment);
    }

    let mut balances: Vec<PatientBalance> = patients
        .iter()
        .map(|patient| {
            let patient_bills = bills_by_patient
                .get(&patient.id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut history: Vec<PaymentRecord> = patient_bills
                .iter()
                .flat_map(|bill| {
                    payments_by_bill
                        .get(&bill.id)
                        .into_iter()
                        .flatten()
                        .map(move |payment| PaymentRecord {
                            id: payment.id,
                            bill_id: payment.bill_id,
                            amount: payment.amount,
                            date: payment.date,
                            method: payment.method,
                            appointment_id: bill.appointment_id,
                            notes: payment.notes.clone(),
                        })
                })
                .collect();
            history.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));

            let total_billed: Decimal = patient_bills.iter().map(|bill| bill.total).sum();
            let total_paid: Decimal = history.iter().map(|record| record.amount).sum();

            PatientBalance {
                patient_id: patient.id,
                patient_name: patient.full_name(),
                total_billed,
                total_paid,
                remaining_balance: total_billed - total_paid,
                last_payment_date: history.first().map(|record| record.date),
                last_bill_date: patient_bills.iter().map(|bill| bill.issue_date).max(),
                payment_history: history,
            }
        })
        .collect();

    balances.sort_by(|a, b| {
        a.patient_name
            .cmp(&b.patient_name)
            .then_with(|| a.patient_id.cmp(&b.patient_id))
    });
    balances
}

pub fn balance_for(balances: &[PatientBalance], patient_id: Uuid) -> Option<&PatientBalance> {
    balances.iter().find(|balance| balance.patient_id == patient_id)
}

/// Patients who still owe money
pub fn with_outstanding_balance(balances: &[PatientBalance]) -> Vec<&PatientBalance> {
    balances
        .iter()
        .filter(|balance| balance.remaining_balance > Decimal::ZERO)
        .collect()
}

/// The `limit` largest outstanding balances, largest first
pub fn top_debtors(balances: &[PatientBalance], limit: usize) -> Vec<&PatientBalance> {
    let mut debtors = with_outstanding_balance(balances);
    debtors.sort_by(|a, b| b.remaining_balance.cmp(&a.remaining_balance));
    debtors.truncate(limit);
    debtors
}

pub fn total_outstanding(balances: &[PatientBalance]) -> Decimal {
    balances.iter().map(|balance| balance.remaining_balance).sum()
}

/// Summaries for every patient with something left to pay
pub fn payment_summaries(
    balances: &[PatientBalance],
    bills: &[Bill],
    payments: &[Payment],
    appointments: &[Appointment],
    today: NaiveDate,
) -> Vec<PatientPaymentSummary> {
    let paid = paid_by_bill(payments);

    with_outstanding_balance(balances)
        .into_iter()
        .map(|balance| {
            let overdue_amount = bills
                .iter()
                .filter(|bill| bill.patient_id == balance.patient_id)
                .filter(|bill| matches!(bill.status, BillStatus::Sent | BillStatus::Overdue))
                .filter(|bill| bill.due_date < today)
                .map(|bill| bill.total - paid.get(&bill.id).copied().unwrap_or(Decimal::ZERO))
                .sum();

            PatientPaymentSummary {
                patient_id: balance.patient_id,
                patient_name: balance.patient_name.clone(),
                total_outstanding: balance.remaining_balance,
                overdue_amount,
                last_visit_date: balance.last_bill_date,
                next_appointment_date: next_appointment_for(appointments, balance.patient_id, today),
            }
        })
        .collect()
}
