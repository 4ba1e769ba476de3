//! Store-backed clinic operations
//!
//! Each operation calls the server, then dispatches the result into the
//! [`Store`]. Failures are dispatched as well and returned to the caller.
//!
//! Only the initial load may fall back to the built-in sample data, and only
//! when the caller asked for it with [`FallbackPolicy::SampleData`]. The
//! returned [`DataOrigin`] tells the caller what is being shown.

use chrono::{DateTime, Utc};
use clinic_core::fixtures::SampleData;
use clinic_core::schedule::AppointmentAction;
use clinic_db::models::{
    Appointment, AppointmentUpdate, Bill, BillUpdate, NewAppointment, NewBill, NewPatient,
    NewPayment, NewServiceTemplate, PaidBill, Patient, PatientUpdate, Payment, PaymentSubmission,
    RescheduleRequest, ServiceTemplate,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::store::{Action, Collections, DataOrigin, Store};

/// What to do when the initial load fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Return the error and leave the store empty
    #[default]
    Surface,
    /// Show the built-in sample data and still record the error
    SampleData,
}

pub struct ClinicService {
    api: ApiClient,
    store: Store,
    fallback: FallbackPolicy,
}

impl ClinicService {
    pub fn new(api: ApiClient, store: Store, fallback: FallbackPolicy) -> Self {
        Self { api, store, fallback }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    async fn fetch_all(&self) -> Result<Collections, ClientError> {
        let (patients, appointments, bills, payments, service_templates) = tokio::try_join!(
            self.api.list_patients(),
            self.api.list_appointments(),
            self.api.list_bills(),
            self.api.list_payments(),
            self.api.list_service_templates(),
        )?;
        Ok(Collections {
            patients,
            appointments,
            bills,
            payments,
            service_templates,
        })
    }

    /// Loads every collection into the store.
    ///
    /// `now` dates the sample data when the fallback is used.
    pub async fn load_all(&self, now: DateTime<Utc>) -> Result<DataOrigin, ClientError> {
        match self.fetch_all().await {
            Ok(data) => {
                info!(patients = data.patients.len(), "clinic data loaded");
                self.store.dispatch(Action::Loaded {
                    data,
                    origin: DataOrigin::Remote,
                });
                Ok(DataOrigin::Remote)
            }
            Err(error) => match self.fallback {
                FallbackPolicy::Surface => {
                    warn!("loading clinic data failed: {}", error);
                    self.store.dispatch(Action::Failed(error.clone()));
                    Err(error)
                }
                FallbackPolicy::SampleData => {
                    warn!("loading clinic data failed, showing sample data: {}", error);
                    self.store.dispatch(Action::Loaded {
                        data: SampleData::generate(now.date_naive(), now).into(),
                        origin: DataOrigin::Sample,
                    });
                    self.store.dispatch(Action::Failed(error));
                    Ok(DataOrigin::Sample)
                }
            },
        }
    }

    /// Dispatches the outcome of a write and hands it back
    fn settle<T: Clone>(
        &self,
        result: Result<T, ClientError>,
        on_success: impl FnOnce(T) -> Action,
    ) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.store.dispatch(on_success(value.clone()));
                Ok(value)
            }
            Err(error) => {
                warn!("clinic request failed: {}", error);
                self.store.dispatch(Action::Failed(error.clone()));
                Err(error)
            }
        }
    }

    // Patients

    pub async fn add_patient(&self, form: &NewPatient) -> Result<Patient, ClientError> {
        let result = self.api.create_patient(form).await;
        self.settle(result, Action::PatientSaved)
    }

    pub async fn update_patient(&self, id: Uuid, update: &PatientUpdate) -> Result<Patient, ClientError> {
        let result = self.api.update_patient(id, update).await;
        self.settle(result, Action::PatientSaved)
    }

    pub async fn delete_patient(&self, id: Uuid) -> Result<(), ClientError> {
        let result = self.api.delete_patient(id).await;
        self.settle(result, |_| Action::PatientRemoved(id))
    }

    // Appointments

    pub async fn book_appointment(&self, form: &NewAppointment) -> Result<Appointment, ClientError> {
        let result = self.api.create_appointment(form).await;
        self.settle(result, Action::AppointmentSaved)
    }

    pub async fn update_appointment(
        &self,
        id: Uuid,
        update: &AppointmentUpdate,
    ) -> Result<Appointment, ClientError> {
        let result = self.api.update_appointment(id, update).await;
        self.settle(result, Action::AppointmentSaved)
    }

    /// Completing an appointment also refreshes the patient's visit counters
    pub async fn appointment_action(
        &self,
        id: Uuid,
        action: AppointmentAction,
    ) -> Result<Appointment, ClientError> {
        let result = self.api.appointment_action(id, action).await;
        let appointment = self.settle(result, Action::AppointmentSaved)?;

        if action == AppointmentAction::Complete {
            let patient = self.api.get_patient(appointment.patient_id).await;
            self.settle(patient, Action::PatientSaved)?;
        }
        Ok(appointment)
    }

    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        request: &RescheduleRequest,
    ) -> Result<Appointment, ClientError> {
        let result = self.api.reschedule_appointment(id, request).await;
        self.settle(result, Action::AppointmentSaved)
    }

    pub async fn delete_appointment(&self, id: Uuid) -> Result<(), ClientError> {
        let result = self.api.delete_appointment(id).await;
        self.settle(result, |_| Action::AppointmentRemoved(id))
    }

    // Bills

    pub async fn create_bill(&self, form: &NewBill) -> Result<Bill, ClientError> {
        let result = self.api.create_bill(form).await;
        self.settle(result, Action::BillSaved)
    }

    pub async fn update_bill(&self, id: Uuid, update: &BillUpdate) -> Result<Bill, ClientError> {
        let result = self.api.update_bill(id, update).await;
        self.settle(result, Action::BillSaved)
    }

    pub async fn send_bill(&self, id: Uuid) -> Result<Bill, ClientError> {
        let result = self.api.send_bill(id).await;
        self.settle(result, Action::BillSaved)
    }

    pub async fn cancel_bill(&self, id: Uuid) -> Result<Bill, ClientError> {
        let result = self.api.cancel_bill(id).await;
        self.settle(result, Action::BillSaved)
    }

    pub async fn mark_bill_paid(
        &self,
        id: Uuid,
        submission: &PaymentSubmission,
    ) -> Result<PaidBill, ClientError> {
        let result = self.api.mark_bill_paid(id, submission).await;
        let paid = self.settle(result, |paid: PaidBill| Action::BillSaved(paid.bill))?;
        self.store.dispatch(Action::PaymentSaved(paid.payment.clone()));
        Ok(paid)
    }

    pub async fn delete_bill(&self, id: Uuid) -> Result<(), ClientError> {
        let result = self.api.delete_bill(id).await;
        self.settle(result, |_| Action::BillRemoved(id))
    }

    // Payments

    /// Records a payment, then reloads the bill whose status it changed
    pub async fn record_payment(&self, form: &NewPayment) -> Result<Payment, ClientError> {
        let result = self.api.create_payment(form).await;
        let payment = self.settle(result, Action::PaymentSaved)?;

        let bill = self.api.get_bill(payment.bill_id).await;
        self.settle(bill, Action::BillSaved)?;
        Ok(payment)
    }

    pub async fn delete_payment(&self, id: Uuid) -> Result<(), ClientError> {
        let result = self.api.delete_payment(id).await;
        self.settle(result, |_| Action::PaymentRemoved(id))
    }

    // Service templates

    pub async fn add_service_template(
        &self,
        form: &NewServiceTemplate,
    ) -> Result<ServiceTemplate, ClientError> {
        let result = self.api.create_service_template(form).await;
        self.settle(result, Action::TemplateSaved)
    }

    pub async fn delete_service_template(&self, id: Uuid) -> Result<(), ClientError> {
        let result = self.api.delete_service_template(id).await;
        self.settle(result, |_| Action::TemplateRemoved(id))
    }
}
