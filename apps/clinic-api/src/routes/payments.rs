//! Payment endpoints
//!
//! - `GET /api/payments`, `GET /api/payments/bill/:bill_id`
//! - `POST /api/payments`, `GET|DELETE /api/payments/:id`
//!
//! Recording a payment also moves its bill to partial or paid.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_core::billing::payment_reference;
use clinic_core::billing::reports::paid_for_bill;
use clinic_core::billing::status::{self, PaymentRequest};
use clinic_db::models::{NewPayment, Payment};
use clinic_db::payments;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(payments::list_payments(&state.pool).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Payment>> {
    Ok(Json(payments::get_payment(&state.pool, id).await?))
}

pub async fn for_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(payments::payments_for_bill(&state.pool, bill_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewPayment>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    form.validate()?;
    let reference = form
        .reference
        .filter(|reference| !reference.trim().is_empty())
        .unwrap_or_else(|| payment_reference(&mut rand::thread_rng()));
    let request = PaymentRequest {
        amount: Some(form.amount),
        method: form.method,
        reference,
        notes: form.notes,
    };

    let now = state.now();
    let (bill, payment) = payments::record_for_bill(&state.pool, form.bill_id, |bill, earlier| {
        let already_paid = paid_for_bill(bill.id, earlier);
        let mut payment = status::record_payment(bill, already_paid, request, now)?;
        if let Some(date) = form.date {
            payment.date = date;
            bill.payment_date = Some(date);
        }
        Ok::<_, ApiError>(payment)
    })
    .await?;
    info!(payment_id = %payment.id, bill_number = %bill.bill_number, amount = %payment.amount, "payment recorded");
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Removes the payment record only; the bill keeps its status
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    payments::delete_payment(&state.pool, id).await?;
    info!(payment_id = %id, "payment deleted");
    Ok(StatusCode::NO_CONTENT)
}
