//! Typed REST client for the clinic service
//!
//! One method per endpoint under `/api`. Every call returns a
//! [`ClientError`] on failure; nothing here substitutes sample data.

use std::time::Duration;

use chrono::NaiveDate;
use clinic_core::balance::{PatientBalance, PatientPaymentSummary};
use clinic_core::dashboard::DashboardStats;
use clinic_core::schedule::{AppointmentAction, DaySchedule, WeekGrid};
use clinic_db::models::{
    Appointment, AppointmentUpdate, Bill, BillStatus, BillUpdate, ConflictCheck, ConflictQuery,
    NewAppointment, NewBill, NewPatient, NewPayment, NewServiceTemplate, PaidBill, Patient,
    PatientUpdate, Payment, PaymentSubmission, RescheduleRequest, ServiceTemplate,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ClientError;

/// Default server address
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub database: bool,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "clinic server rejected a request");
            return Err(ClientError::from_body(status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!(path, "GET");
        self.json(self.request(Method::GET, path)).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        debug!(path, %method, "sending");
        self.json(self.request(method, path).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!(path, "POST");
        self.json(self.request(Method::POST, path)).await
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        debug!(path, "DELETE");
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get("/health").await
    }

    // Patients

    pub async fn list_patients(&self) -> Result<Vec<Patient>, ClientError> {
        self.get("/patients").await
    }

    pub async fn get_patient(&self, id: Uuid) -> Result<Patient, ClientError> {
        self.get(&format!("/patients/{}", id)).await
    }

    pub async fn search_patients(&self, term: &str) -> Result<Vec<Patient>, ClientError> {
        debug!(term, "searching patients");
        self.json(self.request(Method::GET, "/patients/search").query(&[("q", term)]))
            .await
    }

    pub async fn create_patient(&self, form: &NewPatient) -> Result<Patient, ClientError> {
        self.send(Method::POST, "/patients", form).await
    }

    pub async fn update_patient(&self, id: Uuid, update: &PatientUpdate) -> Result<Patient, ClientError> {
        self.send(Method::PATCH, &format!("/patients/{}", id), update).await
    }

    pub async fn delete_patient(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("/patients/{}", id)).await
    }

    // Appointments

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, ClientError> {
        self.get("/appointments").await
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Appointment, ClientError> {
        self.get(&format!("/appointments/{}", id)).await
    }

    pub async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, ClientError> {
        self.get(&format!("/appointments/patient/{}", patient_id)).await
    }

    pub async fn appointments_on(&self, date: NaiveDate) -> Result<Vec<Appointment>, ClientError> {
        self.get(&format!("/appointments/date/{}", date)).await
    }

    pub async fn upcoming_appointments(&self, days: i64) -> Result<Vec<Appointment>, ClientError> {
        self.json(
            self.request(Method::GET, "/appointments/upcoming")
                .query(&[("days", days)]),
        )
        .await
    }

    pub async fn check_conflict(&self, query: &ConflictQuery) -> Result<ConflictCheck, ClientError> {
        self.send(Method::POST, "/appointments/check-conflict", query).await
    }

    pub async fn create_appointment(&self, form: &NewAppointment) -> Result<Appointment, ClientError> {
        self.send(Method::POST, "/appointments", form).await
    }

    pub async fn update_appointment(
        &self,
        id: Uuid,
        update: &AppointmentUpdate,
    ) -> Result<Appointment, ClientError> {
        self.send(Method::PATCH, &format!("/appointments/{}", id), update)
            .await
    }

    pub async fn delete_appointment(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("/appointments/{}", id)).await
    }

    /// Applies a lifecycle action other than rescheduling
    pub async fn appointment_action(
        &self,
        id: Uuid,
        action: AppointmentAction,
    ) -> Result<Appointment, ClientError> {
        self.post_empty(&format!("/appointments/{}/{}", id, action.slug())).await
    }

    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        request: &RescheduleRequest,
    ) -> Result<Appointment, ClientError> {
        self.send(
            Method::POST,
            &format!("/appointments/{}/reschedule", id),
            request,
        )
        .await
    }

    // Bills

    pub async fn list_bills(&self) -> Result<Vec<Bill>, ClientError> {
        self.get("/bills").await
    }

    pub async fn get_bill(&self, id: Uuid) -> Result<Bill, ClientError> {
        self.get(&format!("/bills/{}", id)).await
    }

    pub async fn bills_for_patient(&self, patient_id: Uuid) -> Result<Vec<Bill>, ClientError> {
        self.get(&format!("/bills/patient/{}", patient_id)).await
    }

    pub async fn bills_with_status(&self, status: BillStatus) -> Result<Vec<Bill>, ClientError> {
        self.get(&format!("/bills/status/{}", status)).await
    }

    pub async fn overdue_bills(&self) -> Result<Vec<Bill>, ClientError> {
        self.get("/bills/overdue").await
    }

    pub async fn create_bill(&self, form: &NewBill) -> Result<Bill, ClientError> {
        self.send(Method::POST, "/bills", form).await
    }

    pub async fn update_bill(&self, id: Uuid, update: &BillUpdate) -> Result<Bill, ClientError> {
        self.send(Method::PATCH, &format!("/bills/{}", id), update).await
    }

    pub async fn delete_bill(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("/bills/{}", id)).await
    }

    pub async fn send_bill(&self, id: Uuid) -> Result<Bill, ClientError> {
        self.post_empty(&format!("/bills/{}/send", id)).await
    }

    pub async fn cancel_bill(&self, id: Uuid) -> Result<Bill, ClientError> {
        self.post_empty(&format!("/bills/{}/cancel", id)).await
    }

    pub async fn mark_bill_paid(
        &self,
        id: Uuid,
        submission: &PaymentSubmission,
    ) -> Result<PaidBill, ClientError> {
        self.send(Method::POST, &format!("/bills/{}/mark-paid", id), submission)
            .await
    }

    /// Invoice PDF bytes
    pub async fn bill_pdf(&self, id: Uuid) -> Result<Vec<u8>, ClientError> {
        let response = self
            .execute(self.request(Method::GET, &format!("/bills/{}/pdf", id)))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;
        Ok(bytes.to_vec())
    }

    // Payments

    pub async fn list_payments(&self) -> Result<Vec<Payment>, ClientError> {
        self.get("/payments").await
    }

    pub async fn get_payment(&self, id: Uuid) -> Result<Payment, ClientError> {
        self.get(&format!("/payments/{}", id)).await
    }

    pub async fn payments_for_bill(&self, bill_id: Uuid) -> Result<Vec<Payment>, ClientError> {
        self.get(&format!("/payments/bill/{}", bill_id)).await
    }

    /// Records a payment; the server updates the bill status as well
    pub async fn create_payment(&self, form: &NewPayment) -> Result<Payment, ClientError> {
        self.send(Method::POST, "/payments", form).await
    }

    pub async fn delete_payment(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("/payments/{}", id)).await
    }

    // Service templates

    pub async fn list_service_templates(&self) -> Result<Vec<ServiceTemplate>, ClientError> {
        self.get("/serviceTemplates").await
    }

    pub async fn create_service_template(
        &self,
        form: &NewServiceTemplate,
    ) -> Result<ServiceTemplate, ClientError> {
        self.send(Method::POST, "/serviceTemplates", form).await
    }

    pub async fn delete_service_template(&self, id: Uuid) -> Result<(), ClientError> {
        self.delete(&format!("/serviceTemplates/{}", id)).await
    }

    // Derived views

    pub async fn day_schedule(&self, date: NaiveDate) -> Result<DaySchedule, ClientError> {
        self.get(&format!("/schedule/day/{}", date)).await
    }

    pub async fn week_grid(&self, date: NaiveDate) -> Result<WeekGrid, ClientError> {
        self.get(&format!("/schedule/week/{}", date)).await
    }

    pub async fn balances(&self) -> Result<Vec<PatientBalance>, ClientError> {
        self.get("/balances").await
    }

    pub async fn outstanding_balances(&self) -> Result<Vec<PatientPaymentSummary>, ClientError> {
        self.get("/balances/outstanding").await
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        self.get("/dashboard").await
    }
}
