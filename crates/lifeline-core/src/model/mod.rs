// ── Domain model ──

pub mod alert;
pub mod coordinate;
pub mod session;
pub mod session_id;

pub use alert::{Alert, AlertStatus};
pub use coordinate::Coordinate;
pub use session::{DispatchFailure, DispatchResult, FailureKind, SessionState, TriggerSession};
pub use session_id::SessionId;
