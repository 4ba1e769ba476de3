//! Revenue and receivables figures over bill and payment collections

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clinic_db::models::{Bill, BillStatus, Payment};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Sum of payments per bill
pub fn paid_by_bill(payments: &[Payment]) -> HashMap<Uuid, Decimal> {
    let mut paid: HashMap<Uuid, Decimal> = HashMap::new();
    for payment in payments {
        *paid.entry(payment.bill_id).or_insert(Decimal::ZERO) += payment.amount;
    }
    paid
}

pub fn paid_for_bill(bill_id: Uuid, payments: &[Payment]) -> Decimal {
    payments
        .iter()
        .filter(|payment| payment.bill_id == bill_id)
        .map(|payment| payment.amount)
        .sum()
}

/// Bills sent and waiting for payment (sent or overdue)
pub fn pending_bills(bills: &[Bill]) -> Vec<&Bill> {
    bills
        .iter()
        .filter(|bill| matches!(bill.status, BillStatus::Sent | BillStatus::Overdue))
        .collect()
}

/// Sent or overdue bills whose due date is before `today`
pub fn overdue_bills(bills: &[Bill], today: NaiveDate) -> Vec<&Bill> {
    pending_bills(bills)
        .into_iter()
        .filter(|bill| bill.status == BillStatus::Overdue || bill.due_date < today)
        .collect()
}

/// Total of the bills paid in the given calendar month
pub fn monthly_revenue(bills: &[Bill], year: i32, month: u32) -> Decimal {
    bills
        .iter()
        .filter(|bill| bill.status == BillStatus::Paid)
        .filter(|bill| {
            bill.payment_date
                .map_or(false, |paid| paid.year() == year && paid.month() == month)
        })
        .map(|bill| bill.total)
        .sum()
}

/// Total of the bills paid within `[start, end]`
pub fn revenue_between(bills: &[Bill], start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    bills
        .iter()
        .filter(|bill| bill.status == BillStatus::Paid)
        .filter(|bill| bill.payment_date.map_or(false, |paid| paid >= start && paid <= end))
        .map(|bill| bill.total)
        .sum()
}

/// Amount still owed on sent, overdue and partially paid bills
pub fn outstanding_amount(bills: &[Bill], payments: &[Payment]) -> Decimal {
    let paid = paid_by_bill(payments);
    bills
        .iter()
        .filter(|bill| {
            matches!(
                bill.status,
                BillStatus::Sent | BillStatus::Overdue | BillStatus::Partial
            )
        })
        .map(|bill| {
            let received = paid.get(&bill.id).copied().unwrap_or(Decimal::ZERO);
            (bill.total - received).max(Decimal::ZERO)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::tests::{draft, line};
    use chrono::TimeZone;
    use clinic_db::models::PaymentMethod;

    fn with_status(status: BillStatus, due: NaiveDate) -> Bill {
        let mut bill = draft(vec![line("Cleaning", 1, 100)], 0);
        bill.status = status;
        bill.due_date = due;
        bill
    }

    fn payment(bill_id: Uuid, amount: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            bill_id,
            amount: Decimal::new(amount, 0),
            method: PaymentMethod::Cash,
            date: Utc::now(),
            reference: "PAY-000000000".into(),
            notes: String::new(),
        }
    }

    #[test]
    fn pending_and_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let bills = vec![
            with_status(BillStatus::Sent, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            with_status(BillStatus::Sent, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
            with_status(BillStatus::Overdue, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            with_status(BillStatus::Draft, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            with_status(BillStatus::Paid, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        ];
        assert_eq!(pending_bills(&bills).len(), 3);
        let overdue = overdue_bills(&bills, today);
        assert_eq!(
            overdue.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![bills[0].id, bills[2].id]
        );
    }

    #[test]
    fn revenue_counts_paid_bills_by_payment_month() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut march = with_status(BillStatus::Paid, due);
        march.payment_date = Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        let mut april = with_status(BillStatus::Paid, due);
        april.payment_date = Some(Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap());
        let mut partial = with_status(BillStatus::Partial, due);
        partial.payment_date = march.payment_date;

        let bills = vec![march, april, partial];
        assert_eq!(monthly_revenue(&bills, 2024, 3), Decimal::new(108, 0));
        assert_eq!(
            revenue_between(
                &bills,
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 4, 30, 0, 0, 0).unwrap()
            ),
            Decimal::new(216, 0)
        );
    }

    #[test]
    fn outstanding_subtracts_payments() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let partial = with_status(BillStatus::Partial, due);
        let sent = with_status(BillStatus::Sent, due);
        let draft = with_status(BillStatus::Draft, due);
        let payments = vec![payment(partial.id, 50), payment(draft.id, 10)];

        assert_eq!(
            outstanding_amount(&[partial.clone(), sent, draft], &payments),
            Decimal::new(166, 0)
        );
        assert_eq!(paid_for_bill(partial.id, &payments), Decimal::new(50, 0));
        assert_eq!(paid_by_bill(&payments).len(), 2);
    }
}
