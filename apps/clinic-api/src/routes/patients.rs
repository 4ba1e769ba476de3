//! Patient endpoints
//!
//! - `GET /api/patients?term=&sort=` list, filtered and sorted
//! - `GET /api/patients/search?q=` free-text search
//! - `POST /api/patients`, `GET|PATCH|DELETE /api/patients/:id`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_core::search::{search_patients, PatientQuery};
use clinic_db::models::{NewPatient, Patient, PatientUpdate};
use clinic_db::patients;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PatientQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    let all = patients::list_patients(&state.pool).await?;
    let found = search_patients(&all, &query).into_iter().cloned().collect();
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Patient>>> {
    let all = patients::list_patients(&state.pool).await?;
    let query = PatientQuery {
        term: params.q,
        ..Default::default()
    };
    Ok(Json(search_patients(&all, &query).into_iter().cloned().collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Patient>> {
    Ok(Json(patients::get_patient(&state.pool, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewPatient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    form.validate()?;
    let patient = Patient::register(Uuid::new_v4(), form, state.now());
    patients::insert_patient(&state.pool, &patient).await?;
    info!(patient_id = %patient.id, "patient registered");
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<PatientUpdate>,
) -> ApiResult<Json<Patient>> {
    update.validate()?;
    let mut patient = patients::get_patient(&state.pool, id).await?;
    update.apply_to(&mut patient);
    patients::update_patient(&state.pool, &patient).await?;
    Ok(Json(patient))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    patients::delete_patient(&state.pool, id).await?;
    info!(patient_id = %id, "patient deleted");
    Ok(StatusCode::NO_CONTENT)
}
