// ── Location acquisition ──
//
// Location is best-effort: the controller bounds every request by its own
// timeout and dispatches without coordinates when the provider fails.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::duration_millis;
use crate::model::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,

    #[error("no position fix: {reason}")]
    Unavailable { reason: String },

    #[error("no position fix within {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
}

impl LocationError {
    pub(crate) fn timed_out(timeout: Duration) -> Self {
        Self::TimedOut {
            timeout_ms: duration_millis(timeout),
        }
    }
}

/// Source of the device position.
///
/// `timeout` is advisory; the controller enforces it regardless of whether
/// the provider honours it.
pub trait LocationProvider: Send + Sync + 'static {
    fn current_location(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinate, LocationError>> + Send;
}

impl<P: LocationProvider> LocationProvider for Arc<P> {
    fn current_location(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Coordinate, LocationError>> + Send {
        (**self).current_location(timeout)
    }
}

/// A fixed position, e.g. from `--lat/--lon` or the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinate);

impl LocationProvider for FixedLocation {
    async fn current_location(&self, _timeout: Duration) -> Result<Coordinate, LocationError> {
        Ok(self.0)
    }
}

/// No position source; alerts go out with `location: null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_location(&self, _timeout: Duration) -> Result<Coordinate, LocationError> {
        Err(LocationError::Unavailable {
            reason: "no location source configured".into(),
        })
    }
}
