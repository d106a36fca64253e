//! Try-on failures and their user-facing presentation.
//!
//! Provider failures are classified into a few coarse categories. Each
//! category carries a fixed message and status; provider details only go to
//! logs and Sentry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use super::image::ImageError;

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "too many requests", "429"];
const CREDIT_MARKERS: &[&str] = &[
    "insufficient credit",
    "credits",
    "balance",
    "quota",
    "payment required",
    "402",
];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline exceeded"];

/// Errors from a try-on run.
#[derive(Debug, Error)]
pub enum TryOnError {
    /// The request body is missing or contradicts itself.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A supplied image failed validation.
    #[error("invalid image: {0}")]
    Image(#[from] ImageError),

    /// The provider is throttling us.
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    /// The provider account is out of credit.
    #[error("provider out of credit: {0}")]
    InsufficientCredits(String),

    /// The task did not finish in time.
    #[error("try-on timed out: {0}")]
    Timeout(String),

    /// A garment or result image could not be fetched.
    #[error("download failed: {0}")]
    Download(String),

    /// The provider reported the task as failed.
    #[error("try-on task failed: {0}")]
    TaskFailed(String),

    /// Provider credentials are not configured.
    #[error("try-on misconfigured: {0}")]
    Misconfigured(String),

    /// Any other provider error.
    #[error("provider error ({status:?}): {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// Transport failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for TryOnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl TryOnError {
    /// Classify a provider failure from its HTTP status and message text.
    ///
    /// Status 429 and 402 are decisive; otherwise the message is matched
    /// case-insensitively against known markers.
    #[must_use]
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let message = message.trim().to_string();
        match status {
            Some(429) => return Self::RateLimited(message),
            Some(402) => return Self::InsufficientCredits(message),
            Some(408 | 504) => return Self::Timeout(message),
            _ => {}
        }

        let lower = message.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

        if has(RATE_LIMIT_MARKERS) {
            Self::RateLimited(message)
        } else if has(CREDIT_MARKERS) {
            Self::InsufficientCredits(message)
        } else if has(TIMEOUT_MARKERS) {
            Self::Timeout(message)
        } else {
            Self::Provider { status, message }
        }
    }

    /// Stable machine-readable category, returned as `details`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Image(_) => "invalid_image",
            Self::RateLimited(_) => "rate_limited",
            Self::InsufficientCredits(_) => "insufficient_credits",
            Self::Timeout(_) => "timeout",
            Self::Download(_) => "download_failed",
            Self::TaskFailed(_) => "task_failed",
            Self::Misconfigured(_) => "misconfigured",
            Self::Provider { .. } | Self::Http(_) => "provider_error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Image(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::InsufficientCredits(_) | Self::Misconfigured(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Download(_) | Self::TaskFailed(_) | Self::Provider { .. } | Self::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Message safe to show the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(detail) => detail.clone(),
            Self::Image(err) => format!("Invalid image: {err}"),
            Self::RateLimited(_) => {
                "The try-on service is busy right now. Please wait a moment and try again."
                    .to_string()
            }
            Self::InsufficientCredits(_) => {
                "Virtual try-on is temporarily unavailable. Please try again later.".to_string()
            }
            Self::Timeout(_) => {
                "The try-on took too long to finish. Please try again.".to_string()
            }
            Self::Download(_) => {
                "We couldn't load one of the images. Please check the garment image and try again."
                    .to_string()
            }
            Self::TaskFailed(_) => {
                "The try-on couldn't be generated. Try a clearer, front-facing photo.".to_string()
            }
            Self::Misconfigured(_) => "Virtual try-on is not available right now.".to_string(),
            Self::Provider { .. } | Self::Http(_) => {
                "The try-on service returned an error. Please try again.".to_string()
            }
        }
    }

    /// Failures worth an error report (ours or the provider's, not the shopper's).
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCredits(_)
                | Self::Misconfigured(_)
                | Self::Provider { .. }
                | Self::Http(_)
        )
    }
}

/// Error body for the try-on endpoint.
#[derive(Debug, Serialize)]
pub struct TryOnErrorBody {
    pub error: String,
    pub details: &'static str,
}

impl IntoResponse for TryOnError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Try-on error");
        } else {
            tracing::warn!(error = %self, "Try-on failed");
        }

        let body = TryOnErrorBody {
            error: self.user_message(),
            details: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_status() {
        assert!(matches!(
            TryOnError::classify(Some(429), "slow down"),
            TryOnError::RateLimited(_)
        ));
        assert!(matches!(
            TryOnError::classify(Some(402), "pay up"),
            TryOnError::InsufficientCredits(_)
        ));
        assert!(matches!(
            TryOnError::classify(Some(504), "gateway"),
            TryOnError::Timeout(_)
        ));
    }

    #[test]
    fn test_classify_by_message_text() {
        assert!(matches!(
            TryOnError::classify(Some(400), "Rate Limit exceeded for account"),
            TryOnError::RateLimited(_)
        ));
        assert!(matches!(
            TryOnError::classify(None, "Account balance not enough"),
            TryOnError::InsufficientCredits(_)
        ));
        assert!(matches!(
            TryOnError::classify(Some(500), "Insufficient credits remaining"),
            TryOnError::InsufficientCredits(_)
        ));
        assert!(matches!(
            TryOnError::classify(Some(500), "upstream request timed out"),
            TryOnError::Timeout(_)
        ));
        assert!(matches!(
            TryOnError::classify(Some(500), "model exploded"),
            TryOnError::Provider {
                status: Some(500),
                ..
            }
        ));
    }

    #[test]
    fn test_categories_map_to_fixed_messages_and_status() {
        let err = TryOnError::classify(Some(429), "Too Many Requests: key abc123");
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.code(), "rate_limited");
        assert!(!err.user_message().contains("abc123"));

        let err = TryOnError::Timeout("60 polls".to_string());
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            err.user_message(),
            "The try-on took too long to finish. Please try again."
        );

        let err = TryOnError::Misconfigured("TRYON_API_KEY".to_string());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.user_message().contains("TRYON_API_KEY"));
    }

    #[test]
    fn test_invalid_request_message_is_shown() {
        let err = TryOnError::InvalidRequest("personImageBase64 is required".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "personImageBase64 is required");
    }
}
