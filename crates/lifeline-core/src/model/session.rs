// ── Trigger session domain types ──

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumString};

use lifeline_api::{AlertReceipt, TriggerType};

use super::coordinate::Coordinate;
use super::session_id::SessionId;
use crate::config::duration_millis;
use crate::error::CoreError;
use crate::location::LocationError;

// ── SessionState ────────────────────────────────────────────────────

/// Lifecycle of one attempt to raise an alert.
///
/// ```text
/// Idle ─▶ Arming ─┬─▶ Cancelled
///                 └─▶ Dispatching ─┬─▶ Confirmed
///                                  └─▶ Failed
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Arming,
    Cancelled,
    Dispatching,
    Confirmed,
    Failed,
}

impl SessionState {
    /// `Cancelled`, `Confirmed`, and `Failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Confirmed | Self::Failed)
    }

    /// A session in this state blocks a new `begin`.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Arming | Self::Dispatching)
    }

    /// The only edges of the state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Arming)
                | (Self::Arming, Self::Cancelled | Self::Dispatching)
                | (Self::Dispatching, Self::Confirmed | Self::Failed)
        )
    }
}

// ── Dispatch outcome ────────────────────────────────────────────────

/// Classification of the error that ended a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Every attempt (or the last one) timed out.
    Timeout,
    /// Connection failure or server-side (5xx / 429) error.
    Network,
    /// The backend refused the request (4xx, including auth).
    Rejected,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
    /// Submission attempts made before giving up.
    pub attempts: u32,
}

impl DispatchFailure {
    pub fn from_error(err: &CoreError, attempts: u32) -> Self {
        let kind = match err {
            CoreError::TransportTimeout { .. } => FailureKind::Timeout,
            CoreError::TransportNetworkError { .. } => FailureKind::Network,
            CoreError::TransportRejected { .. } | CoreError::AuthenticationFailed { .. } => {
                FailureKind::Rejected
            }
            _ => FailureKind::Other,
        };
        Self {
            kind,
            status: err.status(),
            message: err.to_string(),
            attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchResult {
    Confirmed(AlertReceipt),
    Failed(DispatchFailure),
}

// ── TriggerSession ──────────────────────────────────────────────────

/// Snapshot of one session, from gesture start to terminal outcome.
///
/// Only the controller mutates the live session; every value handed to
/// callers is a copy.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerSession {
    pub id: SessionId,
    pub state: SessionState,
    pub trigger_type: TriggerType,
    pub armed_at: DateTime<Utc>,
    #[serde(rename = "required_hold_ms", serialize_with = "as_millis")]
    pub required_hold: Duration,
    /// Time left before auto-dispatch; zero once the countdown is over.
    #[serde(rename = "remaining_ms", serialize_with = "as_millis")]
    pub remaining: Duration,
    pub location: Option<Coordinate>,
    /// Why `location` is empty, when acquisition was attempted and failed.
    pub location_error: Option<LocationError>,
    pub attempts: u32,
    pub dispatch_result: Option<DispatchResult>,
}

impl TriggerSession {
    pub(crate) fn arming(trigger_type: TriggerType, required_hold: Duration) -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Arming,
            trigger_type,
            armed_at: Utc::now(),
            required_hold,
            remaining: required_hold,
            location: None,
            location_error: None,
            attempts: 0,
            dispatch_result: None,
        }
    }

    /// Apply `next` if the state machine allows it.
    pub(crate) fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        if !matches!(next, SessionState::Arming) {
            self.remaining = Duration::ZERO;
        }
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Server-issued alert id once confirmed.
    pub fn server_id(&self) -> Option<&str> {
        match &self.dispatch_result {
            Some(DispatchResult::Confirmed(receipt)) => Some(&receipt.alert_id),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&AlertReceipt> {
        match &self.dispatch_result {
            Some(DispatchResult::Confirmed(receipt)) => Some(receipt),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&DispatchFailure> {
        match &self.dispatch_result {
            Some(DispatchResult::Failed(failure)) => Some(failure),
            _ => None,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration_millis(*d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::Confirmed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Arming.is_terminal());
        assert!(!SessionState::Dispatching.is_terminal());
    }

    #[test]
    fn only_enumerated_transitions_are_permitted() {
        use SessionState::{Arming, Cancelled, Confirmed, Dispatching, Failed, Idle};

        let all = [Idle, Arming, Cancelled, Dispatching, Confirmed, Failed];
        let allowed = [
            (Idle, Arming),
            (Arming, Cancelled),
            (Arming, Dispatching),
            (Dispatching, Confirmed),
            (Dispatching, Failed),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn cancelled_session_cannot_dispatch() {
        let mut session = TriggerSession::arming(TriggerType::Manual, Duration::from_secs(3));
        assert!(session.transition(SessionState::Cancelled));
        assert!(!session.transition(SessionState::Dispatching));
        assert_eq!(session.state, SessionState::Cancelled);
        assert_eq!(session.remaining, Duration::ZERO);
    }

    #[test]
    fn state_display_is_snake_case() {
        assert_eq!(SessionState::Dispatching.to_string(), "dispatching");
        assert_eq!("cancelled".parse::<SessionState>().ok(), Some(SessionState::Cancelled));
    }

    #[test]
    fn failure_classification() {
        let timeout = DispatchFailure::from_error(&CoreError::TransportTimeout { timeout_ms: 15 }, 3);
        assert_eq!(timeout.kind, FailureKind::Timeout);
        assert_eq!(timeout.attempts, 3);

        let rejected = DispatchFailure::from_error(
            &CoreError::TransportRejected {
                status: 400,
                message: "bad".into(),
            },
            1,
        );
        assert_eq!(rejected.kind, FailureKind::Rejected);
        assert_eq!(rejected.status, Some(400));
    }
}
