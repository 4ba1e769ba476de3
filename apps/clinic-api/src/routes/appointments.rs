//! Appointment endpoints
//!
//! - `GET /api/appointments?term=&status=&date=` list
//! - `GET /api/appointments/patient/:patient_id`, `/date/:date`, `/upcoming?days=`
//! - `POST /api/appointments/check-conflict`
//! - `POST /api/appointments`, `GET|PATCH|DELETE /api/appointments/:id`
//! - `POST /api/appointments/:id/{confirm,start,complete,cancel,no-show,send-reminder}`
//! - `POST /api/appointments/:id/reschedule`
//!
//! Bookings and moves are refused when they overlap another live appointment.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use clinic_core::schedule::appointments::{self as lifecycle, find_conflict, upcoming};
use clinic_core::schedule::AppointmentAction;
use clinic_core::search::{search_appointments, AppointmentQuery};
use clinic_db::models::{
    Appointment, AppointmentStatus, AppointmentUpdate, ConflictCheck, ConflictQuery,
    NewAppointment, RescheduleRequest,
};
use clinic_db::{appointments, patients, DbError};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Days ahead listed by `/upcoming` when `days` is absent
const DEFAULT_UPCOMING_DAYS: i64 = 7;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AppointmentQuery>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let all = appointments::list_appointments(&state.pool).await?;
    Ok(Json(search_appointments(&all, &query).into_iter().cloned().collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Appointment>> {
    Ok(Json(appointments::get_appointment(&state.pool, id).await?))
}

pub async fn for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(appointments::appointments_for_patient(&state.pool, patient_id).await?))
}

pub async fn on_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(appointments::appointments_on(&state.pool, date).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingParams {
    pub days: Option<i64>,
}

pub async fn list_upcoming(
    State(state): State<AppState>,
    Query(params): Query<UpcomingParams>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let days = params.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    if days < 0 {
        return Err(ApiError::BadRequest(format!("days must not be negative, got {}", days)));
    }
    let all = appointments::list_appointments(&state.pool).await?;
    Ok(Json(upcoming(&all, state.today(), days).into_iter().cloned().collect()))
}

async fn conflict_for(
    state: &AppState,
    date: NaiveDate,
    start: chrono::NaiveTime,
    duration: i32,
    exclude: Option<Uuid>,
) -> ApiResult<Option<Uuid>> {
    let that_day = appointments::appointments_on(&state.pool, date).await?;
    Ok(find_conflict(&that_day, date, start, duration, exclude).map(|a| a.id))
}

/// Refuses `appointment` when it overlaps another one
async fn ensure_free(state: &AppState, appointment: &Appointment) -> ApiResult<()> {
    if matches!(
        appointment.status,
        AppointmentStatus::Cancelled | AppointmentStatus::NoShow
    ) {
        return Ok(());
    }
    let conflict = conflict_for(
        state,
        appointment.appointment_date,
        appointment.start_time,
        appointment.duration,
        Some(appointment.id),
    )
    .await?;
    match conflict {
        Some(other) => Err(ApiError::Conflict(format!(
            "{} {} overlaps appointment {}",
            appointment.appointment_date,
            appointment.start_time.format("%H:%M"),
            other
        ))),
        None => Ok(()),
    }
}

pub async fn check_conflict(
    State(state): State<AppState>,
    Json(query): Json<ConflictQuery>,
) -> ApiResult<Json<ConflictCheck>> {
    query.validate()?;
    let appointment_id = conflict_for(
        &state,
        query.appointment_date,
        query.start_time,
        query.duration,
        query.exclude_id,
    )
    .await?;
    Ok(Json(ConflictCheck {
        conflict: appointment_id.is_some(),
        appointment_id,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewAppointment>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    form.validate()?;
    let patient = patients::get_patient(&state.pool, form.patient_id).await?;
    let appointment = lifecycle::book(
        Uuid::new_v4(),
        form,
        patient.full_name(),
        &state.hours,
        state.now(),
    )?;
    ensure_free(&state, &appointment).await?;

    appointments::insert_appointment(&state.pool, &appointment).await?;
    info!(appointment_id = %appointment.id, date = %appointment.appointment_date, "appointment booked");
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<AppointmentUpdate>,
) -> ApiResult<Json<Appointment>> {
    update.validate()?;
    let mut appointment = appointments::get_appointment(&state.pool, id).await?;
    let moved = update.appointment_date.is_some()
        || update.start_time.is_some()
        || update.duration.is_some();

    lifecycle::apply_update(&mut appointment, update, &state.hours, state.now())?;
    if moved {
        ensure_free(&state, &appointment).await?;
    }
    appointments::update_appointment(&state.pool, &appointment).await?;
    Ok(Json(appointment))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    appointments::delete_appointment(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn act(state: AppState, id: Uuid, action: AppointmentAction) -> ApiResult<Json<Appointment>> {
    let mut appointment = appointments::get_appointment(&state.pool, id).await?;
    let now = state.now();
    match action {
        AppointmentAction::Confirm => lifecycle::confirm(&mut appointment, now)?,
        AppointmentAction::Start => lifecycle::start(&mut appointment, now)?,
        AppointmentAction::Complete => lifecycle::complete(&mut appointment, now)?,
        AppointmentAction::Cancel => lifecycle::cancel(&mut appointment, now)?,
        AppointmentAction::NoShow => lifecycle::mark_no_show(&mut appointment, now)?,
        AppointmentAction::SendReminder => lifecycle::send_reminder(&mut appointment, now)?,
        AppointmentAction::Reschedule => {
            return Err(ApiError::BadRequest(
                "rescheduling needs a new date and time".to_string(),
            ))
        }
    }
    appointments::update_appointment(&state.pool, &appointment).await?;

    if action == AppointmentAction::Complete {
        match patients::record_visit(&state.pool, appointment.patient_id, appointment.appointment_date).await {
            Ok(()) => {}
            Err(DbError::NotFound(_)) => {
                warn!(patient_id = %appointment.patient_id, "completed appointment of a deleted patient")
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(appointment_id = %id, action = action.slug(), status = %appointment.status, "appointment updated");
    Ok(Json(appointment))
}

pub async fn confirm(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Appointment>> {
    act(state, id, AppointmentAction::Confirm).await
}

pub async fn start(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Appointment>> {
    act(state, id, AppointmentAction::Start).await
}

pub async fn complete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Appointment>> {
    act(state, id, AppointmentAction::Complete).await
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Appointment>> {
    act(state, id, AppointmentAction::Cancel).await
}

pub async fn no_show(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Appointment>> {
    act(state, id, AppointmentAction::NoShow).await
}

pub async fn send_reminder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    act(state, id, AppointmentAction::SendReminder).await
}

pub async fn reschedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> ApiResult<Json<Appointment>> {
    let mut appointment = appointments::get_appointment(&state.pool, id).await?;
    lifecycle::reschedule(
        &mut appointment,
        request.appointment_date,
        request.start_time,
        &state.hours,
        state.now(),
    )?;
    ensure_free(&state, &appointment).await?;
    appointments::update_appointment(&state.pool, &appointment).await?;
    info!(appointment_id = %id, date = %appointment.appointment_date, "appointment rescheduled");
    Ok(Json(appointment))
}
