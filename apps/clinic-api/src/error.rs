//! API errors and their JSON responses
//!
//! Every failure is answered with `{ "error": code, "message": text }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clinic_core::{BillingError, ExportError, ScheduleError};
use clinic_db::DbError;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_failed",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail, "internal error");
                "An internal error occurred".to_string()
            }
            ApiError::NotFound(detail)
            | ApiError::BadRequest(detail)
            | ApiError::Validation(detail)
            | ApiError::Conflict(detail) => detail.clone(),
        };

        let body = ErrorBody {
            error: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ApiError::NotFound(format!("Entity not found: {}", what)),
            DbError::ConstraintViolation(detail) => ApiError::Conflict(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Transition(_) => ApiError::Conflict(err.to_string()),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Transition { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<clinic_core::TransitionError> for ApiError {
    fn from(err: clinic_core::TransitionError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Pdf(detail) => ApiError::Internal(detail),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_is_404_with_code() {
        let response = ApiError::from(DbError::not_found("patient", "42")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "not_found");
        assert_eq!(json["message"], "Entity not found: patient 42");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response = ApiError::from(DbError::QueryError("syntax error".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let constraint = ApiError::from(DbError::ConstraintViolation("UNIQUE".into()));
        assert_eq!(constraint.status(), StatusCode::CONFLICT);

        let billing = ApiError::from(BillingError::NoItems);
        assert_eq!(billing.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let schedule = ApiError::from(ScheduleError::InvalidDuration(2));
        assert_eq!(schedule.code(), "validation_failed");

        let export = ApiError::from(ExportError::NoCompleteItems);
        assert_eq!(export.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
