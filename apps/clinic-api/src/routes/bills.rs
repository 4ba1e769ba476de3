//! Bill endpoints
//!
//! - `GET /api/bills?term=&status=` list, newest first
//! - `GET /api/bills/patient/:patient_id`, `/status/:status`, `/overdue`
//! - `POST /api/bills`, `GET|PATCH|DELETE /api/bills/:id`
//! - `POST /api/bills/:id/{send,mark-paid,cancel}`
//! - `GET /api/bills/:id/pdf` invoice download
//!
//! Sent and partially paid bills past their due date are switched to overdue
//! whenever bills are listed.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use clinic_core::billing::reports::{overdue_bills, paid_for_bill};
use clinic_core::billing::status::{self, PaymentRequest};
use clinic_core::billing::{self, bill_number_prefix, next_bill_number, payment_reference};
use clinic_core::export::{invoice_filename, render_invoice_pdf};
use clinic_core::search::{search_bills, BillQuery};
use clinic_db::models::{Bill, BillStatus, BillUpdate, NewBill, PaidBill, PaymentSubmission};
use clinic_db::{bills, patients, payments};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Every bill, with overdue statuses brought up to date
pub(crate) async fn load_bills(state: &AppState) -> ApiResult<Vec<Bill>> {
    let mut all = bills::list_bills(&state.pool).await?;
    let changed = status::refresh_overdue(&mut all, state.today(), state.now());
    for bill in all.iter().filter(|bill| changed.contains(&bill.id)) {
        bills::update_bill(&state.pool, bill).await?;
    }
    if !changed.is_empty() {
        info!(count = changed.len(), "bills marked overdue");
    }
    Ok(all)
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<BillQuery>,
) -> ApiResult<Json<Vec<Bill>>> {
    let all = load_bills(&state).await?;
    Ok(Json(search_bills(&all, &query).into_iter().cloned().collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Bill>> {
    Ok(Json(bills::get_bill(&state.pool, id).await?))
}

pub async fn for_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Bill>>> {
    load_bills(&state).await?;
    Ok(Json(bills::bills_for_patient(&state.pool, patient_id).await?))
}

pub async fn with_status(
    State(state): State<AppState>,
    Path(status): Path<BillStatus>,
) -> ApiResult<Json<Vec<Bill>>> {
    load_bills(&state).await?;
    Ok(Json(bills::bills_with_status(&state.pool, status).await?))
}

pub async fn overdue(State(state): State<AppState>) -> ApiResult<Json<Vec<Bill>>> {
    let all = load_bills(&state).await?;
    Ok(Json(overdue_bills(&all, state.today()).into_iter().cloned().collect()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewBill>,
) -> ApiResult<(StatusCode, Json<Bill>)> {
    form.validate()?;
    let patient = patients::get_patient(&state.pool, form.patient_id).await?;

    let issue_date = state.today();
    let taken = bills::bill_numbers_with_prefix(&state.pool, &bill_number_prefix(issue_date)).await?;
    let bill = billing::build_bill(
        Uuid::new_v4(),
        form,
        patient.full_name(),
        next_bill_number(issue_date, &taken),
        issue_date,
        state.now(),
        &state.billing,
    )?;

    bills::insert_bill(&state.pool, &bill).await?;
    info!(bill_number = %bill.bill_number, total = %bill.total, "bill created");
    Ok((StatusCode::CREATED, Json(bill)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<BillUpdate>,
) -> ApiResult<Json<Bill>> {
    update.validate()?;
    let mut bill = bills::get_bill(&state.pool, id).await?;
    billing::apply_update(&mut bill, update, &state.billing, state.now())?;
    bills::update_bill(&state.pool, &bill).await?;
    Ok(Json(bill))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    bills::delete_bill(&state.pool, id).await?;
    info!(bill_id = %id, "bill deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Bill>> {
    let mut bill = bills::get_bill(&state.pool, id).await?;
    status::send(&mut bill, state.now())?;
    bills::update_bill(&state.pool, &bill).await?;
    Ok(Json(bill))
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Bill>> {
    let mut bill = bills::get_bill(&state.pool, id).await?;
    status::cancel(&mut bill, state.now())?;
    bills::update_bill(&state.pool, &bill).await?;
    Ok(Json(bill))
}

/// Records a payment; without an amount the whole balance is paid
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(submission): Json<PaymentSubmission>,
) -> ApiResult<Json<PaidBill>> {
    submission.validate()?;
    let reference = submission
        .reference
        .filter(|reference| !reference.trim().is_empty())
        .unwrap_or_else(|| payment_reference(&mut rand::thread_rng()));
    let request = PaymentRequest {
        amount: submission.amount,
        method: submission.method,
        reference,
        notes: submission.notes,
    };

    let now = state.now();
    let (bill, payment) = payments::record_for_bill(&state.pool, id, |bill, earlier| {
        let already_paid = paid_for_bill(bill.id, earlier);
        Ok::<_, ApiError>(status::record_payment(bill, already_paid, request, now)?)
    })
    .await?;
    info!(bill_number = %bill.bill_number, amount = %payment.amount, status = %bill.status, "payment recorded");
    Ok(Json(PaidBill { bill, payment }))
}

pub async fn pdf(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<impl IntoResponse> {
    let bill = bills::get_bill(&state.pool, id).await?;
    let paid = paid_for_bill(id, &payments::payments_for_bill(&state.pool, id).await?);
    let filename = invoice_filename(&bill);

    let clinic_name = state.clinic_name.clone();
    let bytes = tokio::task::spawn_blocking(move || render_invoice_pdf(&bill, paid, &clinic_name)).await??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}
