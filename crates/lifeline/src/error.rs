//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use lifeline_config::ConfigError;
use lifeline_core::{CoreError, FailureKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DISPATCH_FAILED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the alert backend: {reason}")]
    #[diagnostic(
        code(lifeline::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Try: lifeline health --server <url>"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Backend reports status '{status}'")]
    #[diagnostic(code(lifeline::unhealthy))]
    Unhealthy { status: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(lifeline::auth_failed),
        help(
            "Verify your bearer token.\n\
             Run: lifeline config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(lifeline::no_credentials),
        help(
            "Store one with: lifeline config set-token --profile {profile}\n\
             Or set the LIFELINE_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Alerts ───────────────────────────────────────────────────────
    #[error("Alert {session} failed after {attempts} attempt(s): {reason}")]
    #[diagnostic(
        code(lifeline::dispatch_failed),
        help(
            "The alert did NOT reach the backend. Contact emergency services directly\n\
             if you are in danger, then check: lifeline health"
        )
    )]
    DispatchFailed {
        session: String,
        reason: String,
        attempts: u32,
    },

    #[error("{message}")]
    #[diagnostic(code(lifeline::trigger))]
    Trigger { message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(lifeline::not_found),
        help("Run: lifeline {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(lifeline::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(lifeline::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(lifeline::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: lifeline config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(lifeline::no_config),
        help(
            "Create a profile with: lifeline config init\n\
             or pass --server <url>. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(lifeline::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(lifeline::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {millis}ms")]
    #[diagnostic(
        code(lifeline::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { millis: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unhealthy { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. }
            | Self::ProfileNotFound { .. }
            | Self::ApiError {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::DispatchFailed { .. } => exit_code::DISPATCH_FAILED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Dispatch failure for a session that ended `Failed`.
    pub fn dispatch_failed(session: String, kind: FailureKind, reason: String, attempts: u32) -> Self {
        let reason = match kind {
            FailureKind::Timeout => format!("timed out ({reason})"),
            _ => reason,
        };
        Self::DispatchFailed {
            session,
            reason,
            attempts,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConcurrentTriggerIgnored { .. }
            | CoreError::CancellationTooLate { .. }
            | CoreError::SessionNotFound { .. } => CliError::Trigger {
                message: err.to_string(),
            },

            CoreError::LocationUnavailable(e) => CliError::Validation {
                field: "location".into(),
                reason: e.to_string(),
            },

            CoreError::TransportTimeout { timeout_ms } => CliError::Timeout { millis: timeout_ms },

            CoreError::TransportNetworkError {
                message,
                status: None,
            } => CliError::ConnectionFailed { reason: message },

            CoreError::TransportNetworkError { message, status } => {
                CliError::ApiError { message, status }
            }

            CoreError::TransportRejected { status, message } => CliError::ApiError {
                message,
                status: Some(status),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Api { message, status } => CliError::ApiError { message, status },

            CoreError::AlertNotFound { identifier } => CliError::NotFound {
                resource_type: "alert".into(),
                identifier,
                list_command: "alerts list".into(),
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                message: format!("internal error: {message}"),
                status: None,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
