//! Error definitions for the clinic client

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by every client call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Cannot reach the clinic server at {0}")]
    Unreachable(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server answered {status}: {message}")]
    Status {
        status: u16,
        /// Machine-readable code from the error body, when present
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// The server could not be reached or timed out
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, base_url: &str) -> Self {
        if error.is_connect() || error.is_timeout() {
            ClientError::Unreachable(base_url.to_string())
        } else if error.is_decode() {
            ClientError::Decode(error.to_string())
        } else {
            ClientError::Transport(error.to_string())
        }
    }

    /// Builds a status error from a failed response body
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
            message: String,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => ClientError::Status {
                status,
                code: Some(parsed.error),
                message: parsed.message,
            },
            Err(_) => ClientError::Status {
                status,
                code: None,
                message: body.trim().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_bodies_are_parsed() {
        let error = ClientError::from_body(404, r#"{"error":"not_found","message":"Entity not found: patient 1"}"#);
        assert!(error.is_not_found());
        assert_eq!(
            error,
            ClientError::Status {
                status: 404,
                code: Some("not_found".into()),
                message: "Entity not found: patient 1".into(),
            }
        );
    }

    #[test]
    fn plain_bodies_are_kept() {
        let error = ClientError::from_body(502, "Bad Gateway\n");
        assert_eq!(
            error,
            ClientError::Status {
                status: 502,
                code: None,
                message: "Bad Gateway".into(),
            }
        );
        assert!(!error.is_unreachable());
    }
}
