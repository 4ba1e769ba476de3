//! Read-only views computed from the stored collections
//!
//! - `GET /api/schedule/day/:date` slot grid of one day
//! - `GET /api/schedule/week/:date` Monday-to-Sunday grid around a date
//! - `GET /api/balances`, `GET /api/balances/outstanding`
//! - `GET /api/dashboard`

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use clinic_core::balance::{compute_balances, payment_summaries, PatientBalance, PatientPaymentSummary};
use clinic_core::dashboard::DashboardStats;
use clinic_core::schedule::{DaySchedule, WeekGrid, WeekView};
use clinic_db::{appointments, patients, payments};

use crate::error::ApiResult;
use crate::routes::bills::load_bills;
use crate::state::AppState;

pub async fn day_schedule(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<DaySchedule>> {
    let that_day = appointments::appointments_on(&state.pool, date).await?;
    Ok(Json(DaySchedule::build(date, &that_day, &state.hours)))
}

pub async fn week_grid(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<WeekGrid>> {
    let week = WeekView::containing(date);
    let booked = appointments::appointments_between(&state.pool, week.start, week.end()).await?;
    Ok(Json(week.grid(&booked, &state.hours)))
}

pub async fn balances(State(state): State<AppState>) -> ApiResult<Json<Vec<PatientBalance>>> {
    let all_patients = patients::list_patients(&state.pool).await?;
    let all_bills = load_bills(&state).await?;
    let all_payments = payments::list_payments(&state.pool).await?;
    Ok(Json(compute_balances(&all_patients, &all_bills, &all_payments)))
}

pub async fn outstanding(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PatientPaymentSummary>>> {
    let all_patients = patients::list_patients(&state.pool).await?;
    let all_bills = load_bills(&state).await?;
    let all_payments = payments::list_payments(&state.pool).await?;
    let all_appointments = appointments::list_appointments(&state.pool).await?;

    let balances = compute_balances(&all_patients, &all_bills, &all_payments);
    Ok(Json(payment_summaries(
        &balances,
        &all_bills,
        &all_payments,
        &all_appointments,
        state.today(),
    )))
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let all_patients = patients::list_patients(&state.pool).await?;
    let all_appointments = appointments::list_appointments(&state.pool).await?;
    let all_bills = load_bills(&state).await?;
    let all_payments = payments::list_payments(&state.pool).await?;

    Ok(Json(DashboardStats::compute(
        &all_patients,
        &all_appointments,
        &all_bills,
        &all_payments,
        state.today(),
    )))
}
