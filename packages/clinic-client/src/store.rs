//! Application store
//!
//! - [`AppState`] holds every collection the views read from
//! - [`reduce`] is the only way state changes: `(state, action) -> state`
//! - [`Store`] publishes each new snapshot through a `tokio::sync::watch`
//!   channel so subscribers always see the latest state
//!
//! Responses are applied in the order they are dispatched; a late response
//! overwrites an earlier one.

use std::sync::Arc;

use chrono::NaiveDate;
use clinic_core::balance::{compute_balances, PatientBalance};
use clinic_core::dashboard::DashboardStats;
use clinic_core::fixtures::SampleData;
use clinic_db::models::{Appointment, Bill, Patient, Payment, ServiceTemplate};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

/// Where the collections currently shown came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    /// Nothing loaded yet
    #[default]
    Empty,
    /// Loaded from the clinic server
    Remote,
    /// Built-in sample data, shown because the server could not be reached
    Sample,
}

/// Every collection at once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collections {
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub bills: Vec<Bill>,
    pub payments: Vec<Payment>,
    pub service_templates: Vec<ServiceTemplate>,
}

impl From<SampleData> for Collections {
    fn from(sample: SampleData) -> Self {
        Self {
            patients: sample.patients,
            appointments: sample.appointments,
            bills: sample.bills,
            payments: sample.payments,
            service_templates: sample.service_templates,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub data: Collections,
    pub origin: DataOrigin,
    /// Most recent failure, cleared by the next successful load
    pub last_error: Option<ClientError>,
    /// Number of actions applied so far
    pub revision: u64,
}

impl AppState {
    pub fn patient(&self, id: Uuid) -> Option<&Patient> {
        self.data.patients.iter().find(|p| p.id == id)
    }

    pub fn appointment(&self, id: Uuid) -> Option<&Appointment> {
        self.data.appointments.iter().find(|a| a.id == id)
    }

    pub fn bill(&self, id: Uuid) -> Option<&Bill> {
        self.data.bills.iter().find(|b| b.id == id)
    }

    pub fn payments_for_bill(&self, bill_id: Uuid) -> Vec<&Payment> {
        self.data
            .payments
            .iter()
            .filter(|p| p.bill_id == bill_id)
            .collect()
    }

    pub fn balances(&self) -> Vec<PatientBalance> {
        compute_balances(&self.data.patients, &self.data.bills, &self.data.payments)
    }

    pub fn dashboard(&self, today: NaiveDate) -> DashboardStats {
        DashboardStats::compute(
            &self.data.patients,
            &self.data.appointments,
            &self.data.bills,
            &self.data.payments,
            today,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replaces every collection
    Loaded {
        data: Collections,
        origin: DataOrigin,
    },
    PatientsLoaded(Vec<Patient>),
    PatientSaved(Patient),
    PatientRemoved(Uuid),
    AppointmentsLoaded(Vec<Appointment>),
    AppointmentSaved(Appointment),
    AppointmentRemoved(Uuid),
    BillsLoaded(Vec<Bill>),
    BillSaved(Bill),
    /// Also drops the bill's payments
    BillRemoved(Uuid),
    PaymentsLoaded(Vec<Payment>),
    PaymentSaved(Payment),
    PaymentRemoved(Uuid),
    TemplatesLoaded(Vec<ServiceTemplate>),
    TemplateSaved(ServiceTemplate),
    TemplateRemoved(Uuid),
    Failed(ClientError),
    ErrorCleared,
}

/// Replaces the item with the same id, or appends it
fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> Uuid) {
    let key = id(&item);
    match items.iter_mut().find(|existing| id(existing) == key) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

fn remove<T>(items: &mut Vec<T>, key: Uuid, id: impl Fn(&T) -> Uuid) {
    items.retain(|item| id(item) != key);
}

pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();
    next.revision += 1;

    match action {
        Action::Loaded { data: loaded, origin } => {
            next.data = loaded;
            next.origin = origin;
            next.last_error = None;
        }
        Action::PatientsLoaded(patients) => next.data.patients = patients,
        Action::PatientSaved(patient) => upsert(&mut next.data.patients, patient, |p| p.id),
        Action::PatientRemoved(id) => remove(&mut next.data.patients, id, |p| p.id),
        Action::AppointmentsLoaded(appointments) => next.data.appointments = appointments,
        Action::AppointmentSaved(appointment) => {
            upsert(&mut next.data.appointments, appointment, |a| a.id)
        }
        Action::AppointmentRemoved(id) => remove(&mut next.data.appointments, id, |a| a.id),
        Action::BillsLoaded(bills) => next.data.bills = bills,
        Action::BillSaved(bill) => upsert(&mut next.data.bills, bill, |b| b.id),
        Action::BillRemoved(id) => {
            remove(&mut next.data.bills, id, |b| b.id);
            next.data.payments.retain(|p| p.bill_id != id);
        }
        Action::PaymentsLoaded(payments) => next.data.payments = payments,
        Action::PaymentSaved(payment) => upsert(&mut next.data.payments, payment, |p| p.id),
        Action::PaymentRemoved(id) => remove(&mut next.data.payments, id, |p| p.id),
        Action::TemplatesLoaded(templates) => next.data.service_templates = templates,
        Action::TemplateSaved(template) => upsert(&mut next.data.service_templates, template, |t| t.id),
        Action::TemplateRemoved(id) => remove(&mut next.data.service_templates, id, |t| t.id),
        Action::Failed(error) => next.last_error = Some(error),
        Action::ErrorCleared => next.last_error = None,
    }
    next
}

/// Single source of truth for the client
#[derive(Clone)]
pub struct Store {
    state: Arc<watch::Sender<AppState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            state: Arc::new(sender),
        }
    }

    /// Applies `action` and notifies subscribers
    pub fn dispatch(&self, action: Action) {
        self.state.send_modify(|state| {
            *state = reduce(state, action);
            debug!(revision = state.revision, "store updated");
        });
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Reads the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }
}
