//! Sample clinic data
//!
//! Used when a caller explicitly opts into offline data and to seed demo
//! databases. Ids are stable so that references between the collections
//! (bills to patients, payments to bills) survive regeneration; dates are
//! relative to the `today` passed in.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clinic_db::models::{
    Address, Appointment, AppointmentStatus, AppointmentType, Bill, BillItem, BillStatus,
    EmergencyContact, Patient, Payment, PaymentMethod, Reminder, ServiceCategory,
    ServiceTemplate,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::{bill_number_prefix, BillingPolicy};
use crate::round_money;
use crate::schedule::end_time_for;

const PATIENT_NS: u128 = 0x7a1c_0000_0000_4000_8000_0000_0000_0000;
const APPOINTMENT_NS: u128 = 0x7a1c_0001_0000_4000_8000_0000_0000_0000;
const BILL_NS: u128 = 0x7a1c_0002_0000_4000_8000_0000_0000_0000;
const ITEM_NS: u128 = 0x7a1c_0003_0000_4000_8000_0000_0000_0000;
const PAYMENT_NS: u128 = 0x7a1c_0004_0000_4000_8000_0000_0000_0000;
const TEMPLATE_NS: u128 = 0x7a1c_0005_0000_4000_8000_0000_0000_0000;

pub fn patient_id(n: u128) -> Uuid {
    Uuid::from_u128(PATIENT_NS | n)
}

pub fn appointment_id(n: u128) -> Uuid {
    Uuid::from_u128(APPOINTMENT_NS | n)
}

pub fn bill_id(n: u128) -> Uuid {
    Uuid::from_u128(BILL_NS | n)
}

fn item_id(n: u128) -> Uuid {
    Uuid::from_u128(ITEM_NS | n)
}

pub fn payment_id(n: u128) -> Uuid {
    Uuid::from_u128(PAYMENT_NS | n)
}

pub fn template_id(n: u128) -> Uuid {
    Uuid::from_u128(TEMPLATE_NS | n)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn registered(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

/// Every sample collection, mutually consistent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleData {
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub bills: Vec<Bill>,
    pub payments: Vec<Payment>,
    pub service_templates: Vec<ServiceTemplate>,
}

impl SampleData {
    pub fn generate(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            patients: sample_patients(),
            appointments: sample_appointments(today, now),
            bills: sample_bills(today, now),
            payments: sample_payments(today, now),
            service_templates: service_templates(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn patient(
    n: u128,
    (first_name, last_name): (&str, &str),
    phone: &str,
    date_of_birth: NaiveDate,
    address: (&str, &str, &str, &str),
    medical_history: &[&str],
    allergies: &[&str],
    emergency: (&str, &str, &str),
    registration_date: DateTime<Utc>,
    last_visit: NaiveDate,
    total_visits: i32,
    notes: &str,
) -> Patient {
    Patient {
        id: patient_id(n),
        first_name: first_name.into(),
        last_name: last_name.into(),
        email: format!("{}.{}@email.com", first_name.to_lowercase(), last_name.to_lowercase()),
        phone: phone.into(),
        date_of_birth,
        gender: None,
        address: Address {
            street: address.0.into(),
            city: address.1.into(),
            state: address.2.into(),
            zip_code: address.3.into(),
        },
        medical_history: medical_history.iter().map(|s| s.to_string()).collect(),
        allergies: allergies.iter().map(|s| s.to_string()).collect(),
        emergency_contact: EmergencyContact {
            name: emergency.0.into(),
            phone: emergency.1.into(),
            relationship: emergency.2.into(),
        },
        registration_date,
        last_visit: Some(last_visit),
        next_appointment: None,
        total_visits,
        notes: notes.into(),
    }
}

pub fn sample_patients() -> Vec<Patient> {
    vec![
        patient(
            1,
            ("John", "Doe"),
            "+1 (555) 123-4567",
            date(1985, 3, 15),
            ("123 Main St", "New York", "NY", "10001"),
            &["Hypertension", "Diabetes Type 2"],
            &["Penicillin"],
            ("Jane Doe", "+1 (555) 123-4568", "Spouse"),
            registered(2023, 1, 15),
            date(2024, 1, 10),
            8,
            "Regular patient, good dental hygiene",
        ),
        patient(
            2,
            ("Sarah", "Wilson"),
            "+1 (555) 987-6543",
            date(1992, 7, 22),
            ("456 Oak Ave", "Los Angeles", "CA", "90210"),
            &[],
            &["Latex"],
            ("Michael Wilson", "+1 (555) 987-6544", "Father"),
            registered(2023, 6, 20),
            date(2024, 1, 5),
            3,
            "Nervous about dental procedures",
        ),
        patient(
            3,
            ("Mike", "Johnson"),
            "+1 (555) 456-7890",
            date(1978, 11, 8),
            ("789 Pine Rd", "Chicago", "IL", "60601"),
            &["Heart Disease"],
            &[],
            ("Lisa Johnson", "+1 (555) 456-7891", "Wife"),
            registered(2022, 9, 10),
            date(2023, 12, 20),
            12,
            "Requires antibiotic premedication",
        ),
    ]
}

fn full_name(patient: u128) -> &'static str {
    match patient {
        1 => "John Doe",
        2 => "Sarah Wilson",
        _ => "Mike Johnson",
    }
}

#[allow(clippy::too_many_arguments)]
fn appointment(
    n: u128,
    patient: u128,
    appointment_date: NaiveDate,
    start: NaiveTime,
    duration: i32,
    appointment_type: AppointmentType,
    status: AppointmentStatus,
    notes: &str,
    now: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id: appointment_id(n),
        patient_id: patient_id(patient),
        patient_name: full_name(patient).into(),
        doctor_name: "Dr. Smith".into(),
        appointment_date,
        start_time: start,
        end_time: end_time_for(start, duration),
        appointment_type,
        status,
        duration,
        notes: notes.into(),
        reminder: Reminder::default(),
        created_date: now,
        updated_date: now,
    }
}

pub fn sample_appointments(today: NaiveDate, now: DateTime<Utc>) -> Vec<Appointment> {
    let tomorrow = today + Duration::days(1);
    let next_week = today + Duration::days(7);

    let mut first = appointment(
        1,
        1,
        today,
        time(9, 0),
        30,
        AppointmentType::Cleaning,
        AppointmentStatus::Confirmed,
        "Regular cleaning appointment",
        now,
    );
    first.reminder = Reminder {
        sent: true,
        sent_date: Some(now),
    };

    vec![
        first,
        appointment(
            2,
            2,
            today,
            time(10, 30),
            60,
            AppointmentType::Extraction,
            AppointmentStatus::Confirmed,
            "Wisdom tooth extraction",
            now,
        ),
        appointment(
            3,
            3,
            today,
            time(14, 0),
            60,
            AppointmentType::RootCanal,
            AppointmentStatus::Scheduled,
            "Root canal treatment - session 2",
            now,
        ),
        appointment(
            4,
            1,
            tomorrow,
            time(11, 0),
            30,
            AppointmentType::FollowUp,
            AppointmentStatus::Scheduled,
            "Follow-up after cleaning",
            now,
        ),
        appointment(
            5,
            2,
            next_week,
            time(15, 30),
            60,
            AppointmentType::Crown,
            AppointmentStatus::Scheduled,
            "Crown placement",
            now,
        ),
    ]
}

fn item(n: u128, description: &str, category: ServiceCategory, unit_price: i64) -> BillItem {
    let unit_price = Decimal::new(unit_price, 0);
    BillItem {
        id: item_id(n),
        description: description.into(),
        category,
        quantity: 1,
        unit_price,
        total: unit_price,
    }
}

#[allow(clippy::too_many_arguments)]
fn bill(
    n: u128,
    patient: u128,
    issue_date: NaiveDate,
    items: Vec<BillItem>,
    discount: i64,
    status: BillStatus,
    notes: &str,
    now: DateTime<Utc>,
) -> Bill {
    let policy = BillingPolicy::default();
    let subtotal: Decimal = items.iter().map(|item| item.total).sum();
    let tax = round_money(subtotal * policy.tax_rate);
    let discount = Decimal::new(discount, 0);
    Bill {
        id: bill_id(n),
        patient_id: patient_id(patient),
        patient_name: full_name(patient).into(),
        appointment_id: Some(appointment_id(n)),
        bill_number: format!("{}{:03}", bill_number_prefix(issue_date), n),
        issue_date,
        due_date: issue_date + Duration::days(policy.payment_terms_days),
        items,
        subtotal,
        tax,
        discount,
        total: subtotal + tax - discount,
        status,
        payment_method: None,
        payment_date: None,
        notes: notes.into(),
        created_date: now,
        updated_date: now,
    }
}

/// A paid cleaning, a sent extraction and an overdue root canal
pub fn sample_bills(today: NaiveDate, now: DateTime<Utc>) -> Vec<Bill> {
    let mut paid = bill(
        1,
        1,
        today - Duration::days(7),
        vec![
            item(1, "Routine Dental Cleaning", ServiceCategory::Cleaning, 120),
            item(2, "Fluoride Treatment", ServiceCategory::Cleaning, 30),
        ],
        0,
        BillStatus::Paid,
        "Regular cleaning appointment",
        now,
    );
    paid.payment_method = Some(PaymentMethod::CreditCard);
    paid.payment_date = Some(now);

    vec![
        paid,
        bill(
            2,
            2,
            today - Duration::days(5),
            vec![
                item(3, "Tooth Extraction", ServiceCategory::Extraction, 250),
                item(4, "Post-extraction Care Kit", ServiceCategory::Medication, 25),
            ],
            0,
            BillStatus::Sent,
            "Wisdom tooth extraction",
            now,
        ),
        bill(
            3,
            3,
            today - Duration::days(40),
            vec![item(5, "Root Canal Treatment", ServiceCategory::RootCanal, 800)],
            50,
            BillStatus::Overdue,
            "Root canal treatment - session 1",
            now,
        ),
    ]
}

/// Full payment of the paid sample bill
pub fn sample_payments(today: NaiveDate, now: DateTime<Utc>) -> Vec<Payment> {
    let paid_bill = sample_bills(today, now)
        .into_iter()
        .find(|bill| bill.status == BillStatus::Paid);
    paid_bill
        .map(|bill| Payment {
            id: payment_id(1),
            bill_id: bill.id,
            amount: bill.total,
            method: PaymentMethod::CreditCard,
            date: now,
            reference: "PAY-CC1234567".into(),
            notes: "Paid in full".into(),
        })
        .into_iter()
        .collect()
}

pub fn service_templates() -> Vec<ServiceTemplate> {
    let template = |n: u128, name: &str, category, price: i64, description: &str| ServiceTemplate {
        id: template_id(n),
        name: name.into(),
        category,
        default_price: Decimal::new(price, 0),
        description: description.into(),
    };
    vec![
        template(1, "Routine Cleaning", ServiceCategory::Cleaning, 120, "Standard dental cleaning and examination"),
        template(2, "Tooth Extraction", ServiceCategory::Extraction, 250, "Simple tooth extraction procedure"),
        template(3, "Root Canal", ServiceCategory::RootCanal, 800, "Root canal treatment procedure"),
        template(4, "Dental Filling", ServiceCategory::Filling, 180, "Composite dental filling"),
        template(5, "Crown Placement", ServiceCategory::Crown, 1200, "Porcelain crown placement"),
    ]
}
