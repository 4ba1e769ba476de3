//! Bill lifecycle
//!
//! - `send`: draft → sent
//! - `record_payment`: draft/sent/partial/overdue → paid or partial
//! - `mark_overdue`: sent/partial past the due date → overdue
//! - `cancel`: anything not yet paid → cancelled
//! Generic edits may still set a status
//! directly; these helpers are what the named actions go through.

use chrono::{DateTime, NaiveDate, Utc};
use clinic_db::models::{Bill, BillStatus, Payment, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::BillingError;

/// Named actions a user can take on a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillAction {
    Send,
    RecordPayment,
    Cancel,
    MarkOverdue,
}

impl std::fmt::Display for BillAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BillAction::Send => "send",
            BillAction::RecordPayment => "record a payment on",
            BillAction::Cancel => "cancel",
            BillAction::MarkOverdue => "mark overdue",
        })
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot {action} a {from} bill")]
pub struct TransitionError {
    pub from: BillStatus,
    pub action: BillAction,
}

/// Actions offered for a bill in the given status
pub fn available_actions(status: BillStatus) -> &'static [BillAction] {
    match status {
        BillStatus::Draft => &[BillAction::Send, BillAction::RecordPayment, BillAction::Cancel],
        BillStatus::Sent | BillStatus::Partial => &[
            BillAction::RecordPayment,
            BillAction::Cancel,
            BillAction::MarkOverdue,
        ],
        BillStatus::Overdue => &[BillAction::RecordPayment, BillAction::Cancel],
        BillStatus::Paid | BillStatus::Cancelled => &[],
    }
}

fn ensure_allowed(status: BillStatus, action: BillAction) -> Result<(), TransitionError> {
    if available_actions(status).contains(&action) {
        Ok(())
    } else {
        Err(TransitionError { from: status, action })
    }
}

/// Draft to sent
pub fn send(bill: &mut Bill, now: DateTime<Utc>) -> Result<(), TransitionError> {
    ensure_allowed(bill.status, BillAction::Send)?;
    bill.status = BillStatus::Sent;
    bill.updated_date = now;
    Ok(())
}

pub fn cancel(bill: &mut Bill, now: DateTime<Utc>) -> Result<(), TransitionError> {
    ensure_allowed(bill.status, BillAction::Cancel)?;
    bill.status = BillStatus::Cancelled;
    bill.updated_date = now;
    Ok(())
}

/// Moves a sent or partially paid bill past its due date to overdue.
///
/// Returns whether the status changed; a bill not yet due is left alone.
pub fn mark_overdue(
    bill: &mut Bill,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<bool, TransitionError> {
    ensure_allowed(bill.status, BillAction::MarkOverdue)?;
    if bill.due_date >= today {
        return Ok(false);
    }
    bill.status = BillStatus::Overdue;
    bill.updated_date = now;
    Ok(true)
}

/// Flags every eligible bill as overdue and returns the ids that changed
pub fn refresh_overdue(bills: &mut [Bill], today: NaiveDate, now: DateTime<Utc>) -> Vec<Uuid> {
    bills
        .iter_mut()
        .filter(|bill| available_actions(bill.status).contains(&BillAction::MarkOverdue))
        .filter_map(|bill| match mark_overdue(bill, today, now) {
            Ok(true) => Some(bill.id),
            _ => None,
        })
        .collect()
}

/// A payment being recorded against a bill
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Defaults to the outstanding balance
    pub amount: Option<Decimal>,
    pub method: PaymentMethod,
    pub reference: String,
    pub notes: String,
}

/// Records a payment: the bill becomes paid once `already_paid` plus this
/// payment covers the total, partial otherwise.
pub fn record_payment(
    bill: &mut Bill,
    already_paid: Decimal,
    request: PaymentRequest,
    now: DateTime<Utc>,
) -> Result<Payment, BillingError> {
    ensure_allowed(bill.status, BillAction::RecordPayment)?;

    let outstanding = bill.total - already_paid;
    let amount = request.amount.unwrap_or(outstanding);
    if amount <= Decimal::ZERO {
        return Err(BillingError::InvalidAmount(amount));
    }

    let paid = already_paid + amount;
    bill.status = if paid >= bill.total {
        BillStatus::Paid
    } else {
        BillStatus::Partial
    };
    bill.payment_method = Some(request.method);
    bill.payment_date = Some(now);
    bill.updated_date = now;

    debug!(bill_id = %bill.id, %amount, status = %bill.status, "payment recorded");

    Ok(Payment {
        id: Uuid::new_v4(),
        bill_id: bill.id,
        amount,
        method: request.method,
        date: now,
        reference: request.reference,
        notes: request.notes,
    })
}
