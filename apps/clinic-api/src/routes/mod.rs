//! REST routes of the clinic service
//!
//! Every route lives under `/api`. Path params use the `:param` syntax.

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod appointments;
pub mod bills;
pub mod health;
pub mod patients;
pub mod payments;
pub mod templates;
pub mod views;

/// Builds the `/api` router over `state`
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::check))
        // Patients
        .route("/patients", get(patients::list).post(patients::create))
        .route("/patients/search", get(patients::search))
        .route(
            "/patients/:id",
            get(patients::get).patch(patients::update).delete(patients::delete),
        )
        // Appointments
        .route(
            "/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route("/appointments/upcoming", get(appointments::list_upcoming))
        .route("/appointments/check-conflict", post(appointments::check_conflict))
        .route(
            "/appointments/patient/:patient_id",
            get(appointments::for_patient),
        )
        .route("/appointments/date/:date", get(appointments::on_date))
        .route(
            "/appointments/:id",
            get(appointments::get)
                .patch(appointments::update)
                .delete(appointments::delete),
        )
        .route("/appointments/:id/confirm", post(appointments::confirm))
        .route("/appointments/:id/start", post(appointments::start))
        .route("/appointments/:id/complete", post(appointments::complete))
        .route("/appointments/:id/cancel", post(appointments::cancel))
        .route("/appointments/:id/no-show", post(appointments::no_show))
        .route("/appointments/:id/reschedule", post(appointments::reschedule))
        .route(
            "/appointments/:id/send-reminder",
            post(appointments::send_reminder),
        )
        // Bills
        .route("/bills", get(bills::list).post(bills::create))
        .route("/bills/overdue", get(bills::overdue))
        .route("/bills/patient/:patient_id", get(bills::for_patient))
        .route("/bills/status/:status", get(bills::with_status))
        .route(
            "/bills/:id",
            get(bills::get).patch(bills::update).delete(bills::delete),
        )
        .route("/bills/:id/send", post(bills::send))
        .route("/bills/:id/mark-paid", post(bills::mark_paid))
        .route("/bills/:id/cancel", post(bills::cancel))
        .route("/bills/:id/pdf", get(bills::pdf))
        // Payments
        .route("/payments", get(payments::list).post(payments::create))
        .route("/payments/bill/:bill_id", get(payments::for_bill))
        .route("/payments/:id", get(payments::get).delete(payments::delete))
        // Service templates
        .route(
            "/serviceTemplates",
            get(templates::list).post(templates::create),
        )
        .route(
            "/serviceTemplates/:id",
            get(templates::get).delete(templates::delete),
        )
        // Derived views
        .route("/schedule/day/:date", get(views::day_schedule))
        .route("/schedule/week/:date", get(views::week_grid))
        .route("/balances", get(views::balances))
        .route("/balances/outstanding", get(views::outstanding))
        .route("/dashboard", get(views::dashboard))
        .with_state(state);

    Router::new().nest("/api", api)
}
