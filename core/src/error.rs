//! Error taxonomy for the client core.
//!
//! The facade is the single place where adapter failures are classified; the
//! slices only ever see a `BackendError` and turn it into a rollback plus a
//! slice-scoped error string for the UI.

use std::time::Duration;

/// Classified failure of a backend operation.
///
/// The distinction matters to callers: `Auth` should send the UI to the login
/// screen, `Validation` never reaches the network, `Timeout` and `Network`
/// are retryable, `Unsupported` is a permanent property of the configured
/// backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Input rejected locally before any optimistic mutation or network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Transport-level failure: DNS, connection refused, malformed body.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected our credentials or session token.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The facade's bounded wait elapsed before the adapter answered.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The configured backend does not implement this capability.
    #[error("{0} is not supported by the configured backend")]
    Unsupported(&'static str),

    /// The server processed the request and reported a failure.
    #[error("{0}")]
    Remote(String),
}

impl BackendError {
    /// Classify an HTTP status plus the server's error text.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => BackendError::Auth(message),
            _ => BackendError::Remote(message),
        }
    }

    /// True for failures worth retrying without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Network(_) | BackendError::Timeout(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_classify_as_auth() {
        assert_eq!(
            BackendError::from_status(401, "expired"),
            BackendError::Auth("expired".to_string())
        );
        assert_eq!(
            BackendError::from_status(403, "forbidden"),
            BackendError::Auth("forbidden".to_string())
        );
        assert_eq!(
            BackendError::from_status(500, "boom"),
            BackendError::Remote("boom".to_string())
        );
    }

    #[test]
    fn retryable_kinds() {
        assert!(BackendError::Network("refused".into()).is_retryable());
        assert!(BackendError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(!BackendError::Auth("expired".into()).is_retryable());
        assert!(!BackendError::Unsupported("circles").is_retryable());
    }
}
