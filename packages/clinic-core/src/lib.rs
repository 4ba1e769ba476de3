//! Clinic Core - business rules of the dental clinic back office
//!
//! This library provides:
//! - Billing totals, bill numbering and the bill lifecycle
//! - Working-hours slot grids, weekly navigation and the appointment lifecycle
//! - Pure search and sort over patients, appointments and bills
//! - Per-patient balance aggregation and dashboard figures
//! - The translation service with a persisted language choice
//! - Sample data for offline use
//! - Invoice and prescription PDF export
//!
//! Everything here is synchronous and works on plain collections; persistence
//! lives in `clinic-db` and transport in the service and client crates.

pub mod balance;
pub mod billing;
pub mod dashboard;
pub mod export;
pub mod fixtures;
pub mod i18n;
pub mod schedule;
pub mod search;

pub use billing::{BillAction, BillingError, BillingPolicy, TransitionError};
pub use export::ExportError;
pub use schedule::{ScheduleError, WorkingHours};

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds an amount to whole cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_to_cents() {
        assert_eq!(round_money(Decimal::new(10405, 3)), Decimal::new(1041, 2));
        assert_eq!(round_money(Decimal::new(-10405, 3)), Decimal::new(-1041, 2));
        assert_eq!(round_money(Decimal::new(10404, 3)), Decimal::new(1040, 2));
    }
}
