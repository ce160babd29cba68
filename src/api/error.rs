use reqwest::StatusCode;
use thiserror::Error;

use super::models::ErrorResponse;
use super::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Builds a backend error from a non-success response body, preferring
    /// the `{ "error": "..." }` message over the canonical reason
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });

        ClientError::Backend {
            status: status.as_u16(),
            message,
        }
    }

    /// Transport-level failures (network or timeout), as opposed to answers from the backend
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            ClientError::Timeout
        } else if value.is_decode() {
            ClientError::Decode(value.to_string())
        } else {
            ClientError::Network(value.to_string())
        }
    }
}

/// Extracts the `error` field from a JSON error body, if present
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error)
        .filter(|message| !message.is_empty())
}
