//! Errors returned by the hosted backend client.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, expired or insufficient credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Email/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The client is missing configuration needed for this call.
    #[error("Backend misconfigured: {0}")]
    Misconfigured(String),
}

/// Error body shapes returned by the table and auth APIs.
///
/// Table errors carry `message`; auth errors carry `msg`, `error_description`
/// or `error` depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Pull a human-readable message out of an error response body.
///
/// Falls back to the first 200 characters of the raw body.
pub(crate) fn extract_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.message.or(e.msg).or(e.error_description).or(e.error))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
