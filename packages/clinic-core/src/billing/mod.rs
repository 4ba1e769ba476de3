//! Billing rules
//!
//! - Totals: `subtotal = Σ quantity × unit price`, tax rounded to cents,
//!   `total = subtotal + tax - discount`
//! - Bill numbers `INV-YYYYMM-NNN` and payment references `PAY-XXXXXXXXX`
//! - Building a bill from the billing form and applying partial updates
//!
//! The bill lifecycle lives in [`status`], revenue figures in [`reports`].

pub mod reports;
pub mod status;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use clinic_db::models::{Bill, BillItem, BillStatus, BillUpdate, NewBill, NewBillItem};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::round_money;

pub use status::{available_actions, BillAction, TransitionError};

/// Errors raised while building or editing a bill
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("A bill needs at least one line item")]
    NoItems,

    #[error("Invalid line item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },

    #[error("Discount cannot be negative: {0}")]
    NegativeDiscount(Decimal),

    #[error("Discount {discount} exceeds the amount due {gross}")]
    DiscountExceedsTotal { discount: Decimal, gross: Decimal },

    #[error("Payment amount must be positive: {0}")]
    InvalidAmount(Decimal),

    #[error("Bill amounts are too large to compute")]
    AmountOverflow,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Clinic-wide billing settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPolicy {
    /// Tax rate as a fraction (0.08 = 8%)
    pub tax_rate: Decimal,
    /// Days between issue and due date
    pub payment_terms_days: i64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            payment_terms_days: 30,
        }
    }
}

/// Money figures of a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

pub fn line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, BillingError> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .ok_or(BillingError::AmountOverflow)
}

/// Totals for a set of billing-form lines
pub fn compute_totals(
    items: &[NewBillItem],
    discount: Decimal,
    policy: &BillingPolicy,
) -> Result<BillTotals, BillingError> {
    totals_from_lines(
        items.iter().map(|item| (item.quantity, item.unit_price)),
        discount,
        policy,
    )
}

/// Totals recomputed from the stored lines of a bill
pub fn bill_totals(
    items: &[BillItem],
    discount: Decimal,
    policy: &BillingPolicy,
) -> Result<BillTotals, BillingError> {
    totals_from_lines(
        items.iter().map(|item| (item.quantity, item.unit_price)),
        discount,
        policy,
    )
}

fn totals_from_lines(
    mut lines: impl Iterator<Item = (i32, Decimal)>,
    discount: Decimal,
    policy: &BillingPolicy,
) -> Result<BillTotals, BillingError> {
    if discount < Decimal::ZERO {
        return Err(BillingError::NegativeDiscount(discount));
    }

    let subtotal = lines.try_fold(Decimal::ZERO, |sum, (quantity, unit_price)| {
        sum.checked_add(line_total(quantity, unit_price)?)
            .ok_or(BillingError::AmountOverflow)
    })?;
    let tax = round_money(
        subtotal
            .checked_mul(policy.tax_rate)
            .ok_or(BillingError::AmountOverflow)?,
    );
    let gross = subtotal.checked_add(tax).ok_or(BillingError::AmountOverflow)?;

    if discount > gross {
        return Err(BillingError::DiscountExceedsTotal { discount, gross });
    }

    Ok(BillTotals {
        subtotal,
        tax,
        discount,
        total: gross - discount,
    })
}

fn validate_items(items: &[NewBillItem]) -> Result<(), BillingError> {
    if items.is_empty() {
        return Err(BillingError::NoItems);
    }
    for (index, item) in items.iter().enumerate() {
        item.validate().map_err(|errors| BillingError::InvalidItem {
            index,
            reason: errors.to_string(),
        })?;
    }
    Ok(())
}

fn to_bill_items(items: Vec<NewBillItem>) -> Result<Vec<BillItem>, BillingError> {
    items
        .into_iter()
        .map(|item| {
            Ok(BillItem {
                id: Uuid::new_v4(),
                total: line_total(item.quantity, item.unit_price)?,
                description: item.description.trim().to_string(),
                category: item.category,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
        })
        .collect()
}

/// Prefix shared by every bill issued in the month of `issue_date`
pub fn bill_number_prefix(issue_date: NaiveDate) -> String {
    format!("INV-{:04}{:02}-", issue_date.year(), issue_date.month())
}

/// Next free bill number for the month, one past the highest sequence in use
pub fn next_bill_number<S: AsRef<str>>(issue_date: NaiveDate, existing: &[S]) -> String {
    let prefix = bill_number_prefix(issue_date);
    let highest = existing
        .iter()
        .filter_map(|number| number.as_ref().strip_prefix(&prefix))
        .filter_map(|sequence| sequence.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", prefix, highest + 1)
}

/// Receipt code for a payment, `PAY-` followed by nine upper-case alphanumerics
pub fn payment_reference<R: Rng>(rng: &mut R) -> String {
    let code: String = rng
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect();
    format!("PAY-{}", code)
}

/// Builds a draft bill from the billing form
pub fn build_bill(
    id: Uuid,
    form: NewBill,
    patient_name: String,
    bill_number: String,
    issue_date: NaiveDate,
    now: DateTime<Utc>,
    policy: &BillingPolicy,
) -> Result<Bill, BillingError> {
    validate_items(&form.items)?;
    let totals = compute_totals(&form.items, form.discount, policy)?;

    Ok(Bill {
        id,
        patient_id: form.patient_id,
        patient_name,
        appointment_id: form.appointment_id,
        bill_number,
        issue_date,
        due_date: issue_date + Duration::days(policy.payment_terms_days),
        items: to_bill_items(form.items)?,
        subtotal: totals.subtotal,
        tax: totals.tax,
        discount: totals.discount,
        total: totals.total,
        status: BillStatus::Draft,
        payment_method: None,
        payment_date: None,
        notes: form.notes,
        created_date: now,
        updated_date: now,
    })
}

/// Applies a partial update, recomputing totals when items or discount change
pub fn apply_update(
    bill: &mut Bill,
    update: BillUpdate,
    policy: &BillingPolicy,
    now: DateTime<Utc>,
) -> Result<(), BillingError> {
    if update.items.is_some() || update.discount.is_some() {
        let discount = update.discount.unwrap_or(bill.discount);
        let (items, totals) = match update.items {
            Some(items) => {
                validate_items(&items)?;
                let totals = compute_totals(&items, discount, policy)?;
                (to_bill_items(items)?, totals)
            }
            None => {
                let totals = bill_totals(&bill.items, discount, policy)?;
                (std::mem::take(&mut bill.items), totals)
            }
        };
        bill.items = items;
        bill.subtotal = totals.subtotal;
        bill.tax = totals.tax;
        bill.discount = totals.discount;
        bill.total = totals.total;
    }

    if let Some(status) = update.status {
        bill.status = status;
    }
    if let Some(due_date) = update.due_date {
        bill.due_date = due_date;
    }
    if let Some(notes) = update.notes {
        bill.notes = notes;
    }
    bill.updated_date = now;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use clinic_db::models::ServiceCategory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) fn line(description: &str, quantity: i32, unit_price: i64) -> NewBillItem {
        NewBillItem {
            description: description.into(),
            category: ServiceCategory::Cleaning,
            quantity,
            unit_price: Decimal::new(unit_price, 0),
        }
    }

    pub(crate) fn draft(items: Vec<NewBillItem>, discount: i64) -> Bill {
        let form = NewBill {
            patient_id: Uuid::new_v4(),
            appointment_id: None,
            items,
            discount: Decimal::new(discount, 0),
            notes: String::new(),
        };
        build_bill(
            Uuid::new_v4(),
            form,
            "John Doe".into(),
            "INV-202401-001".into(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            Utc::now(),
            &BillingPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn worked_example_totals() {
        let items = vec![line("Cleaning", 2, 50), line("X-Ray", 1, 30)];
        let totals = compute_totals(&items, Decimal::new(10, 0), &BillingPolicy::default()).unwrap();
        assert_eq!(totals.subtotal, Decimal::new(130, 0));
        assert_eq!(totals.tax, Decimal::new(1040, 2));
        assert_eq!(totals.total, Decimal::new(13040, 2));
    }

    #[test]
    fn totals_are_internally_consistent() {
        let items = vec![
            line("Filling", 3, 180),
            NewBillItem {
                unit_price: Decimal::new(3333, 2),
                ..line("Fluoride", 7, 0)
            },
        ];
        let policy = BillingPolicy::default();
        let totals = compute_totals(&items, Decimal::new(1999, 2), &policy).unwrap();

        let expected_subtotal: Decimal = items
            .iter()
            .map(|i| Decimal::from(i.quantity) * i.unit_price)
            .sum();
        assert_eq!(totals.subtotal, expected_subtotal);
        assert_eq!(totals.total, totals.subtotal + totals.tax - totals.discount);
        assert_eq!(totals.tax.scale(), 2);
    }

    #[test]
    fn empty_form_previews_zero() {
        let totals = compute_totals(&[], Decimal::ZERO, &BillingPolicy::default()).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn discount_bounds() {
        let items = vec![line("Cleaning", 1, 100)];
        let policy = BillingPolicy::default();
        assert_eq!(
            compute_totals(&items, Decimal::new(-1, 0), &policy),
            Err(BillingError::NegativeDiscount(Decimal::new(-1, 0)))
        );
        assert!(matches!(
            compute_totals(&items, Decimal::new(109, 0), &policy),
            Err(BillingError::DiscountExceedsTotal { .. })
        ));
        let exact = compute_totals(&items, Decimal::new(108, 0), &policy).unwrap();
        assert_eq!(exact.total, Decimal::ZERO);
    }

    #[test]
    fn build_sets_draft_due_date_and_line_totals() {
        let bill = draft(vec![line("Cleaning", 2, 50), line("X-Ray", 1, 30)], 10);
        assert_eq!(bill.status, BillStatus::Draft);
        assert_eq!(bill.due_date, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        assert_eq!(bill.items[0].total, Decimal::new(100, 0));
        assert_eq!(bill.total, Decimal::new(13040, 2));
    }

    #[test]
    fn build_rejects_empty_and_invalid_items() {
        let form = |items| NewBill {
            patient_id: Uuid::nil(),
            appointment_id: None,
            items,
            discount: Decimal::ZERO,
            notes: String::new(),
        };
        let build = |items| {
            build_bill(
                Uuid::nil(),
                form(items),
                "Jane".into(),
                "INV-202401-001".into(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                Utc::now(),
                &BillingPolicy::default(),
            )
        };
        assert_eq!(build(vec![]), Err(BillingError::NoItems));
        assert!(matches!(
            build(vec![line("Cleaning", 1, 10), line("Broken", 0, 10)]),
            Err(BillingError::InvalidItem { index: 1, .. })
        ));
    }

    #[test]
    fn oversized_amounts_are_refused() {
        let policy = BillingPolicy::default();
        let mut huge = line("Implant", 2, 0);
        huge.unit_price = Decimal::from_i128_with_scale(7 * 10i128.pow(28), 0);
        assert_eq!(
            compute_totals(&[huge], Decimal::ZERO, &policy),
            Err(BillingError::AmountOverflow)
        );
        assert_eq!(line_total(2, Decimal::MAX), Err(BillingError::AmountOverflow));
    }

    #[test]
    fn item_only_update_keeps_discount() {
        let mut bill = draft(vec![line("Cleaning", 2, 50), line("X-Ray", 1, 30)], 10);
        let update = BillUpdate {
            items: Some(vec![line("Crown", 1, 200)]),
            ..Default::default()
        };
        apply_update(&mut bill, update, &BillingPolicy::default(), Utc::now()).unwrap();
        assert_eq!(bill.discount, Decimal::new(10, 0));
        assert_eq!(bill.subtotal, Decimal::new(200, 0));
        assert_eq!(bill.tax, Decimal::new(1600, 2));
        assert_eq!(bill.total, Decimal::new(206, 0));
        assert_eq!(bill.items.len(), 1);
    }

    #[test]
    fn discount_only_update_keeps_items() {
        let mut bill = draft(vec![line("Cleaning", 2, 50), line("X-Ray", 1, 30)], 10);
        let ids: Vec<Uuid> = bill.items.iter().map(|i| i.id).collect();
        let update = BillUpdate {
            discount: Some(Decimal::ZERO),
            status: Some(BillStatus::Sent),
            ..Default::default()
        };
        apply_update(&mut bill, update, &BillingPolicy::default(), Utc::now()).unwrap();
        assert_eq!(bill.items.iter().map(|i| i.id).collect::<Vec<_>>(), ids);
        assert_eq!(bill.total, Decimal::new(14040, 2));
        assert_eq!(bill.status, BillStatus::Sent);
    }

    #[test]
    fn rejected_update_leaves_bill_untouched() {
        let mut bill = draft(vec![line("Cleaning", 1, 100)], 0);
        let before = bill.clone();
        let update = BillUpdate {
            discount: Some(Decimal::new(500, 0)),
            ..Default::default()
        };
        assert!(apply_update(&mut bill, update, &BillingPolicy::default(), Utc::now()).is_err());
        assert_eq!(bill, before);
    }

    #[test]
    fn bill_numbers_continue_the_month_sequence() {
        let march = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let none: [&str; 0] = [];
        assert_eq!(next_bill_number(march, &none), "INV-202403-001");
        let existing = ["INV-202403-001", "INV-202403-007", "INV-202402-050", "INV-202403-bad"];
        assert_eq!(next_bill_number(march, &existing), "INV-202403-008");
    }

    #[test]
    fn payment_references_have_fixed_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let reference = payment_reference(&mut rng);
        assert_eq!(reference.len(), 13);
        assert!(reference.starts_with("PAY-"));
        assert!(reference[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
