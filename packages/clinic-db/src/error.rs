//! Error definitions for the clinic-db library
//!
//! This module defines the error types used by the data layer

use thiserror::Error;

/// Errors raised by database operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DbError {
    /// Not-found error naming the entity kind and its id
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        DbError::NotFound(format!("{} {}", kind, id))
    }
}

/// A stored or transmitted enum value that matches no variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Maps SQLx errors onto our error kinds
impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DbError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(dbe) => {
                if let Some(code) = dbe.code() {
                    // SQLITE_CONSTRAINT family: primary key, unique, check, foreign key
                    if matches!(code.as_ref(), "19" | "787" | "1555" | "2067" | "275") {
                        return DbError::ConstraintViolation(dbe.message().to_string());
                    }
                }
                DbError::QueryError(dbe.message().to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::QueryError(format!("Column not found: {}", col))
            }
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::QueryError(format!("Type not found: {}", type_name))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::QueryError(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Io(io_err) => DbError::ConnectionError(io_err.to_string()),
            sqlx::Error::Configuration(conf_err) => DbError::ConnectionError(conf_err.to_string()),
            sqlx::Error::PoolClosed => DbError::ConnectionError("Connection pool closed".to_string()),
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionError("Connection pool timed out".to_string())
            }
            sqlx::Error::WorkerCrashed => {
                DbError::InternalError("Database worker crashed".to_string())
            }
            sqlx::Error::Migrate(err) => DbError::MigrationError(err.to_string()),
            _ => DbError::InternalError(format!("Unexpected error: {:?}", error)),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(error: serde_json::Error) -> Self {
        DbError::EncodingError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn pool_errors_are_connection_errors() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::ConnectionError(_)));
        assert_eq!(
            DbError::not_found("patient", 7).to_string(),
            "Entity not found: patient 7"
        );
    }
}
