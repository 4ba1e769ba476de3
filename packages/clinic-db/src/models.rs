//! Data models shared by every crate of the clinic back office
//!
//! This module defines the persisted entities (patients, appointments, bills,
//! payments, service templates), their closed status enums and the request
//! shapes used to create or partially update them.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::UnknownVariant;

/// Implements the text representation shared by the database and the wire
/// format for a closed enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Lifecycle of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    /// Booked, waiting for the patient to confirm
    Scheduled,
    /// Confirmed by the patient
    Confirmed,
    /// Patient is in the chair
    InProgress,
    /// Visit finished
    Completed,
    /// Cancelled by the clinic or the patient
    Cancelled,
    /// Patient did not show up
    NoShow,
    /// Moved to another date or time
    Rescheduled,
}

text_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    InProgress => "in-progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no-show",
    Rescheduled => "rescheduled",
});

/// Kind of dental visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    Cleaning,
    Filling,
    Extraction,
    RootCanal,
    Crown,
    Implant,
    Orthodontics,
    Emergency,
    FollowUp,
}

text_enum!(AppointmentType {
    Consultation => "consultation",
    Cleaning => "cleaning",
    Filling => "filling",
    Extraction => "extraction",
    RootCanal => "root_canal",
    Crown => "crown",
    Implant => "implant",
    Orthodontics => "orthodontics",
    Emergency => "emergency",
    FollowUp => "follow_up",
});

impl AppointmentType {
    /// Human readable label shown on schedules and invoices
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentType::Consultation => "Consultation",
            AppointmentType::Cleaning => "Routine Cleaning",
            AppointmentType::Filling => "Dental Filling",
            AppointmentType::Extraction => "Tooth Extraction",
            AppointmentType::RootCanal => "Root Canal",
            AppointmentType::Crown => "Crown Placement",
            AppointmentType::Implant => "Dental Implant",
            AppointmentType::Orthodontics => "Orthodontic Treatment",
            AppointmentType::Emergency => "Emergency Visit",
            AppointmentType::FollowUp => "Follow-up Visit",
        }
    }
}

/// Lifecycle of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Being prepared, not yet sent to the patient
    Draft,
    /// Sent, awaiting payment
    Sent,
    /// Fully paid
    Paid,
    /// Past its due date without full payment
    Overdue,
    /// Voided
    Cancelled,
    /// Some payment received, balance remaining
    Partial,
}

text_enum!(BillStatus {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
    Partial => "partial",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Check,
    Insurance,
    BankTransfer,
}

text_enum!(PaymentMethod {
    Cash => "cash",
    CreditCard => "credit_card",
    DebitCard => "debit_card",
    Check => "check",
    Insurance => "insurance",
    BankTransfer => "bank_transfer",
});

/// Category of a billable service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Consultation,
    Cleaning,
    Filling,
    Extraction,
    RootCanal,
    Crown,
    Implant,
    Orthodontics,
    Cosmetic,
    Emergency,
    Medication,
    Other,
}

text_enum!(ServiceCategory {
    Consultation => "consultation",
    Cleaning => "cleaning",
    Filling => "filling",
    Extraction => "extraction",
    RootCanal => "root_canal",
    Crown => "crown",
    Implant => "implant",
    Orthodontics => "orthodontics",
    Cosmetic => "cosmetic",
    Emergency => "emergency",
    Medication => "medication",
    Other => "other",
});

/// Wall-clock times travel as `HH:MM`, the format the schedule grid uses.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(value: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Rejects strings that are empty once trimmed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("negative"));
    }
    Ok(())
}

/// Largest unit price accepted on a bill line
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Between zero and [`MAX_UNIT_PRICE`]
pub fn price_in_range(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    if *value > MAX_UNIT_PRICE {
        return Err(ValidationError::new("too_large"));
    }
    Ok(())
}

pub fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("not_positive"));
    }
    Ok(())
}

/// Postal address of a patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Person to call in an emergency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

/// A registered patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Unique identifier
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Address,
    /// Free text conditions (hypertension, diabetes, ...)
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    /// Date and time the patient was registered
    pub registration_date: DateTime<Utc>,
    #[serde(default)]
    pub last_visit: Option<NaiveDate>,
    #[serde(default)]
    pub next_appointment: Option<NaiveDate>,
    /// Number of completed visits
    #[serde(default)]
    pub total_visits: i32,
    #[serde(default)]
    pub notes: String,
}

impl Patient {
    /// Builds a freshly registered patient from the registration form
    pub fn register(id: Uuid, form: NewPatient, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            date_of_birth: form.date_of_birth,
            gender: form.gender,
            address: form.address,
            medical_history: form.medical_history,
            allergies: form.allergies,
            emergency_contact: form.emergency_contact,
            registration_date: registered_at,
            last_visit: None,
            next_appointment: None,
            total_visits: 0,
            notes: form.notes,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on the given day
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.date_of_birth).unwrap_or(0)
    }
}

impl FromRow<'_, SqliteRow> for Patient {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            date_of_birth: row.try_get("date_of_birth")?,
            gender: row.try_get("gender")?,
            address: Address {
                street: row.try_get("street")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                zip_code: row.try_get("zip_code")?,
            },
            medical_history: decode_json(row, "medical_history")?,
            allergies: decode_json(row, "allergies")?,
            emergency_contact: EmergencyContact {
                name: row.try_get("emergency_name")?,
                phone: row.try_get("emergency_phone")?,
                relationship: row.try_get("emergency_relationship")?,
            },
            registration_date: row.try_get("registration_date")?,
            last_visit: row.try_get("last_visit")?,
            next_appointment: row.try_get("next_appointment")?,
            total_visits: row.try_get("total_visits")?,
            notes: row.try_get("notes")?,
        })
    }
}

/// Registration form for a new patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[validate(custom = "not_blank")]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "not_blank")]
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub notes: String,
}

/// Partial update of a patient; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "not_blank")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "not_blank")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "not_blank")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_appointment: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_visits: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PatientUpdate {
    /// Applies the present fields onto `patient`
    pub fn apply_to(self, patient: &mut Patient) {
        if let Some(v) = self.first_name {
            patient.first_name = v;
        }
        if let Some(v) = self.last_name {
            patient.last_name = v;
        }
        if let Some(v) = self.email {
            patient.email = v;
        }
        if let Some(v) = self.phone {
            patient.phone = v;
        }
        if let Some(v) = self.date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = self.gender {
            patient.gender = Some(v);
        }
        if let Some(v) = self.address {
            patient.address = v;
        }
        if let Some(v) = self.medical_history {
            patient.medical_history = v;
        }
        if let Some(v) = self.allergies {
            patient.allergies = v;
        }
        if let Some(v) = self.emergency_contact {
            patient.emergency_contact = v;
        }
        if let Some(v) = self.last_visit {
            patient.last_visit = Some(v);
        }
        if let Some(v) = self.next_appointment {
            patient.next_appointment = Some(v);
        }
        if let Some(v) = self.total_visits {
            patient.total_visits = v;
        }
        if let Some(v) = self.notes {
            patient.notes = v;
        }
    }
}

/// Reminder delivery state of an appointment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_date: Option<DateTime<Utc>>,
}

/// A booked visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Unique identifier
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Patient name at booking time, kept even if the patient is deleted
    pub patient_name: String,
    pub doctor_name: String,
    pub appointment_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    /// Derived from `start_time` and `duration`
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    /// Length of the visit in minutes
    pub duration: i32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub reminder: Reminder,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Appointment {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            patient_name: row.try_get("patient_name")?,
            doctor_name: row.try_get("doctor_name")?,
            appointment_date: row.try_get("appointment_date")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            appointment_type: decode_text(row, "type")?,
            status: decode_text(row, "status")?,
            duration: row.try_get("duration_minutes")?,
            notes: row.try_get("notes")?,
            reminder: Reminder {
                sent: row.try_get("reminder_sent")?,
                sent_date: row.try_get("reminder_sent_at")?,
            },
            created_date: row.try_get("created_at")?,
            updated_date: row.try_get("updated_at")?,
        })
    }
}

/// Booking form for a new appointment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    #[validate(range(min = 5, max = 480))]
    pub duration: i32,
    #[serde(default)]
    pub notes: String,
    #[validate(custom = "not_blank")]
    pub doctor_name: String,
}

/// Partial update of an appointment
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<NaiveDate>,
    #[serde(
        default,
        with = "clock_time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<NaiveTime>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 5, max = 480))]
    pub duration: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "not_blank")]
    pub doctor_name: Option<String>,
}

/// One line of an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub id: Uuid,
    pub description: String,
    pub category: ServiceCategory,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// `quantity * unit_price`
    pub total: Decimal,
}

impl FromRow<'_, SqliteRow> for BillItem {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            description: row.try_get("description")?,
            category: decode_text(row, "category")?,
            quantity: row.try_get("quantity")?,
            unit_price: decode_text(row, "unit_price")?,
            total: decode_text(row, "total")?,
        })
    }
}

/// An invoice issued to a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// Unique identifier
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Patient name at issue time
    pub patient_name: String,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    /// Human facing number, `INV-YYYYMM-NNN`
    pub bill_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<BillItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    /// `subtotal + tax - discount`
    pub total: Decimal,
    pub status: BillStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Bill {
    /// Line items live in their own table and are attached by the repository
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let payment_method: Option<String> = row.try_get("payment_method")?;
        Ok(Self {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            patient_name: row.try_get("patient_name")?,
            appointment_id: row.try_get("appointment_id")?,
            bill_number: row.try_get("bill_number")?,
            issue_date: row.try_get("issue_date")?,
            due_date: row.try_get("due_date")?,
            items: Vec::new(),
            subtotal: decode_text(row, "subtotal")?,
            tax: decode_text(row, "tax")?,
            discount: decode_text(row, "discount")?,
            total: decode_text(row, "total")?,
            status: decode_text(row, "status")?,
            payment_method: payment_method
                .map(|raw| parse_column("payment_method", &raw))
                .transpose()?,
            payment_date: row.try_get("payment_date")?,
            notes: row.try_get("notes")?,
            created_date: row.try_get("created_at")?,
            updated_date: row.try_get("updated_at")?,
        })
    }
}

/// Line item as typed into the billing form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBillItem {
    #[validate(custom = "not_blank")]
    pub description: String,
    pub category: ServiceCategory,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
    #[validate(custom = "price_in_range")]
    pub unit_price: Decimal,
}

/// Billing form for a new invoice
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub patient_id: Uuid,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
    #[validate]
    pub items: Vec<NewBillItem>,
    #[serde(default)]
    #[validate(custom = "non_negative")]
    pub discount: Decimal,
    #[serde(default)]
    pub notes: String,
}

/// Partial update of a bill
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillUpdate {
    /// Replaces every line item; items are validated when applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<NewBillItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "non_negative")]
    pub discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BillStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Money received against a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: DateTime<Utc>,
    /// Receipt code, `PAY-XXXXXXXXX`
    pub reference: String,
    #[serde(default)]
    pub notes: String,
}

impl FromRow<'_, SqliteRow> for Payment {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            bill_id: row.try_get("bill_id")?,
            amount: decode_text(row, "amount")?,
            method: decode_text(row, "method")?,
            date: row.try_get("paid_at")?,
            reference: row.try_get("reference")?,
            notes: row.try_get("notes")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub bill_id: Uuid,
    #[validate(custom = "positive")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    /// Defaults to now
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Generated when absent
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// Catalogue entry used to pre-fill bill items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: ServiceCategory,
    pub default_price: Decimal,
    #[serde(default)]
    pub description: String,
}

impl ServiceTemplate {
    /// Bill line with this template's defaults
    pub fn to_bill_item(&self, quantity: i32) -> NewBillItem {
        NewBillItem {
            description: self.name.clone(),
            category: self.category,
            quantity,
            unit_price: self.default_price,
        }
    }
}

impl FromRow<'_, SqliteRow> for ServiceTemplate {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category: decode_text(row, "category")?,
            default_price: decode_text(row, "default_price")?,
            description: row.try_get("description")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceTemplate {
    #[validate(custom = "not_blank")]
    pub name: String,
    pub category: ServiceCategory,
    #[validate(custom = "positive")]
    pub default_price: Decimal,
    #[serde(default)]
    pub description: String,
}

/// Body of a "mark as paid" request; the amount defaults to what is still owed
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "positive")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// A bill together with the payment that was just recorded against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidBill {
    pub bill: Bill,
    pub payment: Payment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub appointment_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
}

/// Would a booking overlap an existing appointment?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConflictQuery {
    pub appointment_date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[validate(range(min = 5, max = 480))]
    pub duration: i32,
    /// Appointment being moved, ignored in the check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheck {
    pub conflict: bool,
    #[serde(default)]
    pub appointment_id: Option<Uuid>,
}

fn parse_column<T>(column: &str, raw: &str) -> sqlx::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Reads a TEXT column holding an enum or a decimal
fn decode_text<T>(row: &SqliteRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    parse_column(column, &raw)
}

fn decode_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> sqlx::Result<T> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_serde_representations_agree() {
        for status in AppointmentStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.to_string()));
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), *status);
        }
        for status in BillStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.to_string()));
        }
        for method in PaymentMethod::ALL {
            let json = serde_json::to_value(method).unwrap();
            assert_eq!(json, serde_json::Value::String(method.to_string()));
        }
        for category in ServiceCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::Value::String(category.to_string()));
        }
        for kind in AppointmentType::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.to_string()));
        }
    }

    #[test]
    fn bill_lines_are_bounded() {
        let line = |quantity, unit_price| NewBillItem {
            description: "Implant".into(),
            category: ServiceCategory::Implant,
            quantity,
            unit_price,
        };
        assert!(line(2, Decimal::new(120_000, 2)).validate().is_ok());
        assert!(line(2, MAX_UNIT_PRICE).validate().is_ok());
        assert!(line(2, Decimal::from_i128_with_scale(7 * 10i128.pow(28), 0)).validate().is_err());
        assert!(line(10_001, Decimal::ONE).validate().is_err());
        assert!(line(1, Decimal::new(-1, 0)).validate().is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "archived".parse::<BillStatus>().unwrap_err();
        assert_eq!(err.kind, "BillStatus");
        assert_eq!(err.value, "archived");
    }

    #[test]
    fn appointment_times_use_hours_and_minutes() {
        let json = serde_json::json!({
            "patientId": Uuid::nil(),
            "appointmentDate": "2024-03-04",
            "startTime": "09:30",
            "type": "root_canal",
            "duration": 60,
            "doctorName": "Dr. Smith"
        });
        let request: NewAppointment = serde_json::from_value(json).unwrap();
        assert_eq!(request.start_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(request.appointment_type, AppointmentType::RootCanal);

        let update: AppointmentUpdate =
            serde_json::from_value(serde_json::json!({ "startTime": "14:00:00" })).unwrap();
        assert_eq!(update.start_time, NaiveTime::from_hms_opt(14, 0, 0));
        let back = serde_json::to_value(&update).unwrap();
        assert_eq!(back, serde_json::json!({ "startTime": "14:00" }));
    }

    #[test]
    fn patient_form_validation() {
        let mut form = NewPatient {
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john.doe@email.com".into(),
            phone: "+1 (555) 123-4567".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 15).unwrap(),
            gender: None,
            address: Address::default(),
            medical_history: vec![],
            allergies: vec![],
            emergency_contact: EmergencyContact::default(),
            notes: String::new(),
        };
        assert!(form.validate().is_ok());

        form.email = "not-an-email".into();
        form.first_name = "   ".into();
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("first_name"));
    }

    #[test]
    fn bill_item_minimums() {
        let item = NewBillItem {
            description: "Filling".into(),
            category: ServiceCategory::Filling,
            quantity: 0,
            unit_price: Decimal::new(-1, 0),
        };
        let errors = item.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("unit_price"));
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let payment = NewPayment {
            bill_id: Uuid::nil(),
            amount: Decimal::ZERO,
            method: PaymentMethod::Cash,
            date: None,
            reference: None,
            notes: String::new(),
        };
        assert!(payment.validate().is_err());
    }

    #[test]
    fn patient_update_only_touches_present_fields() {
        let mut patient = Patient {
            id: Uuid::nil(),
            first_name: "Sarah".into(),
            last_name: "Wilson".into(),
            email: "sarah.wilson@email.com".into(),
            phone: "+1 (555) 987-6543".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1992, 7, 22).unwrap(),
            gender: None,
            address: Address::default(),
            medical_history: vec![],
            allergies: vec!["Latex".into()],
            emergency_contact: EmergencyContact::default(),
            registration_date: Utc::now(),
            last_visit: None,
            next_appointment: None,
            total_visits: 3,
            notes: String::new(),
        };
        let update = PatientUpdate {
            phone: Some("+1 (555) 000-0000".into()),
            ..Default::default()
        };
        update.apply_to(&mut patient);
        assert_eq!(patient.phone, "+1 (555) 000-0000");
        assert_eq!(patient.first_name, "Sarah");
        assert_eq!(patient.allergies, vec!["Latex".to_string()]);
        assert_eq!(patient.age_on(NaiveDate::from_ymd_opt(2024, 7, 21).unwrap()), 31);
    }
}
