// ── Core error types ──
//
// User-facing errors from lifeline-core. Consumers never see raw HTTP
// or JSON failures: the `From<lifeline_api::Error>` impl folds them into
// the retryable / terminal transport taxonomy the dispatch loop acts on.

use thiserror::Error;

use crate::location::LocationError;
use crate::model::{SessionId, SessionState};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Trigger signals ──────────────────────────────────────────────
    /// `begin` while another session is arming or dispatching.
    #[error("Trigger ignored: session {active} is already in progress")]
    ConcurrentTriggerIgnored { active: SessionId },

    /// `cancel_hold` after the countdown reached zero.
    #[error("Too late to cancel session {id}: alert is {state}")]
    CancellationTooLate { id: SessionId, state: SessionState },

    #[error("Session not found: {id}")]
    SessionNotFound { id: SessionId },

    // ── Collaborator failures ────────────────────────────────────────
    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] LocationError),

    #[error("Alert submission timed out after {timeout_ms}ms")]
    TransportTimeout { timeout_ms: u64 },

    #[error("Alert submission failed: {message}")]
    TransportNetworkError {
        message: String,
        /// HTTP status for 5xx / 429 responses.
        status: Option<u16>,
    },

    #[error("Alert rejected by server (HTTP {status}): {message}")]
    TransportRejected { status: u16, message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Alert not found: {identifier}")]
    AlertNotFound { identifier: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a failed submission may be attempted again.
    ///
    /// Timeouts, network failures, and server-side errors are retryable;
    /// rejections are terminal so an emergency does not burn its remaining
    /// time re-sending a request the server will refuse again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportTimeout { .. } | Self::TransportNetworkError { .. }
        )
    }

    /// `ConcurrentTriggerIgnored` and `CancellationTooLate` are outcomes the
    /// UI reports to the user, not faults.
    pub fn is_signal(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentTriggerIgnored { .. } | Self::CancellationTooLate { .. }
        )
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransportNetworkError { status, .. } | Self::Api { status, .. } => *status,
            Self::TransportRejected { status, .. } => Some(*status),
            Self::AuthenticationFailed { .. } => Some(401),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lifeline_api::Error> for CoreError {
    fn from(err: lifeline_api::Error) -> Self {
        use lifeline_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Transport(ref e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                CoreError::TransportNetworkError {
                    message: err.to_string(),
                    status: None,
                }
            }
            ApiError::Transport(e) => CoreError::Api {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            ApiError::Timeout { timeout_ms } => CoreError::TransportTimeout { timeout_ms },
            ApiError::RateLimited { retry_after_secs } => CoreError::TransportNetworkError {
                message: format!("rate limited -- retry after {retry_after_secs}s"),
                status: Some(429),
            },
            ApiError::Server { status, message } => CoreError::TransportNetworkError {
                message,
                status: Some(status),
            },
            ApiError::Rejected { status, message } => {
                CoreError::TransportRejected { status, message }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("Deserialization error: {message}"),
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_become_retryable() {
        let err = CoreError::from(lifeline_api::Error::Server {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn validation_rejections_are_terminal() {
        let err = CoreError::from(lifeline_api::Error::Rejected {
            status: 422,
            message: "bad payload".into(),
        });
        assert!(matches!(err, CoreError::TransportRejected { status: 422, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn auth_failures_are_terminal() {
        let err = CoreError::from(lifeline_api::Error::Authentication {
            message: "expired".into(),
        });
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn client_timeout_keeps_its_budget() {
        let err = CoreError::from(lifeline_api::Error::Timeout { timeout_ms: 1000 });
        assert!(matches!(err, CoreError::TransportTimeout { timeout_ms: 1000 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn undecodable_success_is_not_retried() {
        let err = CoreError::from(lifeline_api::Error::Deserialization {
            message: "eof".into(),
            body: String::new(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn signals_are_flagged() {
        let id = SessionId::new();
        assert!(CoreError::ConcurrentTriggerIgnored { active: id }.is_signal());
        assert!(
            CoreError::CancellationTooLate {
                id,
                state: SessionState::Dispatching
            }
            .is_signal()
        );
        assert!(!CoreError::SessionNotFound { id }.is_signal());
    }
}
