//! Emergency-trigger core between `lifeline-api` and UI consumers (CLI / apps).
//!
//! - **[`TriggerController`]**: owns the press-to-confirm countdown. A hold
//!   becomes a [`TriggerSession`] that either gets cancelled inside its window
//!   or converges to exactly one dispatch, which ends `Confirmed` or `Failed`.
//!
//! - **[`SessionHandle`]**: watch-backed view of one session for countdown
//!   rendering: `current()` / `changed()` / `wait_terminal()`.
//!
//! - **Collaborators**: [`LocationProvider`] supplies a best-effort
//!   coordinate, [`AlertTransport`] submits the alert. [`AlertService`] is the
//!   HTTP implementation and also exposes the backend's alert history.
//!
//! - **Domain model** ([`model`]): `SessionId`, `SessionState`,
//!   `DispatchResult`, `Coordinate`, `Alert`.

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod location;
pub mod model;
pub mod store;
pub mod stream;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{RetryPolicy, ServiceConfig, TlsVerification, TriggerConfig};
pub use controller::TriggerController;
pub use error::CoreError;
pub use location::{FixedLocation, LocationError, LocationProvider, NoLocation};
pub use store::SessionLog;
pub use stream::{SessionHandle, SessionStream};
pub use transport::{AlertService, AlertTransport};

pub use lifeline_api::{AlertPayload, AlertReceipt, HealthStatus, TriggerType};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Alert, AlertStatus, Coordinate, DispatchFailure, DispatchResult, FailureKind, SessionId,
    SessionState, TriggerSession,
};
