// ── Runtime trigger and service configuration ──
//
// These types describe *how* a trigger behaves and *where* alerts go.
// They never touch disk: the CLI builds them from its profile config and
// hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use lifeline_api::{TlsMode, TransportConfig};

use crate::error::CoreError;

/// Hold required before an alert is dispatched.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(3);

/// Budget for acquiring a location fix before dispatching without one.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Backoff schedule between submission attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before retry `n` is `backoff[n]`; its length is the retry count.
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: vec![Duration::from_secs(1), Duration::from_secs(3)],
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            backoff: Vec::new(),
        }
    }

    pub fn max_retries(&self) -> u32 {
        u32::try_from(self.backoff.len()).unwrap_or(u32::MAX)
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries().saturating_add(1)
    }

    /// Delay after failed attempt number `attempt` (1-based), if another
    /// attempt is allowed.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        let idx = usize::try_from(attempt).ok()?.checked_sub(1)?;
        self.backoff.get(idx).copied()
    }
}

/// Tuning for one [`TriggerController`](crate::TriggerController).
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub hold_duration: Duration,
    /// Countdown publish interval.
    pub tick_interval: Duration,
    pub location_timeout: Duration,
    /// Per-attempt bound on a submission.
    pub submit_timeout: Duration,
    pub retry: RetryPolicy,
    /// Finished sessions kept for inspection.
    pub history_limit: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            hold_duration: DEFAULT_HOLD,
            tick_interval: Duration::from_millis(100),
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
            submit_timeout: lifeline_api::transport::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            history_limit: 20,
        }
    }
}

impl TriggerConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        let zero = [
            ("hold duration", self.hold_duration),
            ("tick interval", self.tick_interval),
            ("location timeout", self.location_timeout),
            ("submit timeout", self.submit_timeout),
        ]
        .into_iter()
        .find(|(_, d)| d.is_zero());

        if let Some((name, _)) = zero {
            return Err(CoreError::Config {
                message: format!("{name} must be greater than zero"),
            });
        }
        if self.tick_interval > self.hold_duration {
            return Err(CoreError::Config {
                message: format!(
                    "tick interval ({}ms) exceeds hold duration ({}ms)",
                    self.tick_interval.as_millis(),
                    self.hold_duration.as_millis()
                ),
            });
        }
        Ok(())
    }
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed LAN backends).
    DangerAcceptInvalid,
}

/// Where and how to reach the alert backend.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Backend base URL including the API prefix (e.g. `https://host/api`).
    pub url: Url,
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    /// HTTP client timeout.
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            token: None,
            tls: TlsVerification::default(),
            timeout: lifeline_api::transport::DEFAULT_TIMEOUT,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            bearer_token: self.token.clone(),
        }
    }
}
