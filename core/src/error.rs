//! Error taxonomy for outbound calls.
//!
//! Every remote failure is classified as either retryable (transport trouble,
//! rate limiting, upstream hiccups) or fatal for the call that produced it.
//! The retry wrapper only ever asks [`Retryable::is_retryable`].

use thiserror::Error;

/// Classification of an error for the retry wrapper.
pub trait Retryable {
    /// Whether retrying the same call later could plausibly succeed.
    fn is_retryable(&self) -> bool;
}

/// Errors returned by the ordering/inventory API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Network-level failure: connect error, reset, timeout.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The API asked us to slow down (HTTP 429).
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Temporary upstream failure (HTTP 5xx).
    #[error("Upstream error (status {status}): {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// Credentials rejected (HTTP 401/403).
    #[error("Unauthorized (status {status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// Any other non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Response decoding failed: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, unserializable body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Map a non-success HTTP status to its error variant.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => Self::RateLimited,
            401 | 403 => Self::Unauthorized { status, message },
            500..=599 => Self::Upstream { status, message },
            _ => Self::Api { status, message },
        }
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited | Self::Upstream { .. }
        )
    }
}

/// Errors returned by the notification channel.
///
/// A non-200 answer is not an error: it comes back as a
/// [`Delivery`](crate::Delivery) the caller inspects.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// Network-level failure while posting the message.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The request could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl Retryable for NotifyError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from_status(429, String::new()), ApiError::RateLimited);
        assert!(matches!(
            ApiError::from_status(503, "maintenance".to_string()),
            ApiError::Upstream { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(403, "denied".to_string()),
            ApiError::Unauthorized { status: 403, .. }
        ));
        assert!(matches!(
            ApiError::from_status(400, "bad planCode".to_string()),
            ApiError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn test_api_error_classification() {
        assert!(ApiError::Transport("reset".to_string()).is_retryable());
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::from_status(502, String::new()).is_retryable());

        assert!(!ApiError::from_status(400, String::new()).is_retryable());
        assert!(!ApiError::from_status(401, String::new()).is_retryable());
        assert!(!ApiError::Decode("missing field".to_string()).is_retryable());
        assert!(!ApiError::InvalidRequest("bad url".to_string()).is_retryable());
    }

    #[test]
    fn test_notify_error_classification() {
        assert!(NotifyError::Transport("timeout".to_string()).is_retryable());
        assert!(!NotifyError::InvalidRequest("bad url".to_string()).is_retryable());
    }
}
