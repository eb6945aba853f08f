// ── Trigger controller ──
//
// Owns the press-to-confirm countdown and the dispatch that follows it.
// Each session lives in its own `watch` channel; every transition is a
// compare-and-set inside `send_if_modified`, so a release racing the
// deadline resolves to exactly one of `Cancelled` or `Dispatching`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lifeline_api::{AlertPayload, AlertReceipt, TriggerType};

use crate::config::{TriggerConfig, duration_millis};
use crate::error::CoreError;
use crate::location::{LocationError, LocationProvider};
use crate::model::{
    Coordinate, DispatchFailure, DispatchResult, SessionId, SessionState, TriggerSession,
};
use crate::store::{SessionLog, SessionSnapshot};
use crate::stream::SessionHandle;
use crate::transport::AlertTransport;

// ── Active slot ──────────────────────────────────────────────────

/// The most recent session and the handles its countdown task shares.
#[derive(Clone)]
struct ActiveSlot {
    id: SessionId,
    state: Arc<watch::Sender<TriggerSession>>,
    /// Cancelled on a successful release; stops the countdown task.
    timer: CancellationToken,
    deadline: Instant,
}

impl ActiveSlot {
    fn snapshot(&self) -> TriggerSession {
        self.state.borrow().clone()
    }
}

// ── TriggerController ────────────────────────────────────────────

/// Press-and-hold emergency trigger.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. At most one session is
/// arming or dispatching at a time; a finished session stays readable
/// through [`session`](Self::session) and [`recent_sessions`](Self::recent_sessions).
pub struct TriggerController<L, T> {
    inner: Arc<ControllerInner<L, T>>,
}

impl<L, T> Clone for TriggerController<L, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<L, T> {
    config: TriggerConfig,
    location: L,
    transport: T,
    active: watch::Sender<Option<ActiveSlot>>,
    log: SessionLog,
}

impl<L: LocationProvider, T: AlertTransport> TriggerController<L, T> {
    pub fn new(config: TriggerConfig, location: L, transport: T) -> Result<Self, CoreError> {
        config.validate()?;
        let (active, _) = watch::channel(None);
        let log = SessionLog::new(config.history_limit);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                location,
                transport,
                active,
                log,
            }),
        })
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.inner.config
    }

    // ── Gesture ──────────────────────────────────────────────────

    /// Start a manual hold. See [`begin`](Self::begin).
    pub fn begin_hold(&self) -> Result<SessionHandle, CoreError> {
        self.begin(TriggerType::Manual)
    }

    /// Arm a new session and start its countdown.
    ///
    /// Fails with [`CoreError::ConcurrentTriggerIgnored`] while another
    /// session is arming or dispatching; that session's countdown is left
    /// untouched. Must be called from within a tokio runtime.
    pub fn begin(&self, trigger_type: TriggerType) -> Result<SessionHandle, CoreError> {
        let hold = self.inner.config.hold_duration;
        let mut outcome = Err(CoreError::Internal("active slot was not updated".into()));

        self.inner.active.send_if_modified(|slot| {
            if let Some(current) = slot.as_ref() {
                let state = current.state.borrow().state;
                if state.is_active() {
                    outcome = Err(CoreError::ConcurrentTriggerIgnored { active: current.id });
                    return false;
                }
            }

            let session = TriggerSession::arming(trigger_type, hold);
            let id = session.id;
            let (state, _) = watch::channel(session);
            let next = ActiveSlot {
                id,
                state: Arc::new(state),
                timer: CancellationToken::new(),
                deadline: Instant::now() + hold,
            };
            outcome = Ok(next.clone());
            *slot = Some(next);
            true
        });

        let slot = match outcome {
            Ok(slot) => slot,
            Err(e) => {
                debug!(error = %e, "begin ignored");
                return Err(e);
            }
        };

        info!(
            session = %slot.id,
            trigger = %trigger_type,
            hold_ms = duration_millis(hold),
            "hold started"
        );

        let handle = SessionHandle::new(slot.state.subscribe());
        tokio::spawn(countdown_task(self.clone(), slot));
        Ok(handle)
    }

    /// Release the hold.
    ///
    /// Returns the `Cancelled` snapshot when the release lands before the
    /// deadline (again for a session already cancelled). A release at or
    /// after the deadline returns [`CoreError::CancellationTooLate`] and the
    /// alert goes out.
    pub fn cancel_hold(&self, id: &SessionId) -> Result<TriggerSession, CoreError> {
        let slot = self.inner.active.borrow().clone();
        let Some(slot) = slot.filter(|s| s.id == *id) else {
            return match self.inner.log.get(id) {
                Some(s) if s.state == SessionState::Cancelled => Ok(s),
                Some(s) => Err(CoreError::CancellationTooLate {
                    id: *id,
                    state: s.state,
                }),
                None => Err(CoreError::SessionNotFound { id: *id }),
            };
        };

        let now = Instant::now();
        let log = &self.inner.log;
        let mut outcome = Err(CoreError::SessionNotFound { id: *id });

        slot.state.send_if_modified(|s| match s.state {
            SessionState::Arming if now < slot.deadline => {
                s.transition(SessionState::Cancelled);
                log.record(s.clone());
                outcome = Ok(s.clone());
                true
            }
            SessionState::Arming => {
                // Deadline passed but the countdown task has not claimed yet.
                s.transition(SessionState::Dispatching);
                outcome = Err(CoreError::CancellationTooLate {
                    id: *id,
                    state: s.state,
                });
                true
            }
            SessionState::Cancelled => {
                outcome = Ok(s.clone());
                false
            }
            state => {
                outcome = Err(CoreError::CancellationTooLate { id: *id, state });
                false
            }
        });

        match &outcome {
            Ok(_) => {
                slot.timer.cancel();
                info!(session = %id, "hold released, alert cancelled");
            }
            Err(e) => info!(session = %id, error = %e, "release ignored"),
        }
        outcome
    }

    // ── Inspection ───────────────────────────────────────────────

    /// State of the controller: the active session's state, or `Idle`.
    pub fn state(&self) -> SessionState {
        self.current()
            .map_or(SessionState::Idle, |session| session.state)
    }

    /// The session currently arming or dispatching.
    pub fn current(&self) -> Option<TriggerSession> {
        self.inner
            .active
            .borrow()
            .as_ref()
            .map(ActiveSlot::snapshot)
            .filter(|s| s.state.is_active())
    }

    /// Look up a session by id, live or finished.
    pub fn session(&self, id: &SessionId) -> Option<TriggerSession> {
        let live = self
            .inner
            .active
            .borrow()
            .as_ref()
            .filter(|slot| slot.id == *id)
            .map(ActiveSlot::snapshot);
        live.or_else(|| self.inner.log.get(id))
    }

    /// Finished sessions, newest first.
    pub fn recent_sessions(&self) -> SessionSnapshot {
        self.inner.log.snapshot()
    }

    /// Subscribe to a session that is still held by the controller.
    pub fn watch(&self, id: &SessionId) -> Option<SessionHandle> {
        self.inner
            .active
            .borrow()
            .as_ref()
            .filter(|slot| slot.id == *id)
            .map(|slot| SessionHandle::new(slot.state.subscribe()))
    }

    /// Cancel an arming session and wait for an in-flight dispatch to
    /// finish.
    pub async fn shutdown(&self) {
        let slot = self.inner.active.borrow().clone();
        let Some(slot) = slot else { return };

        if slot.state.borrow().state == SessionState::Arming {
            let _ = self.cancel_hold(&slot.id);
        }

        let mut rx = slot.state.subscribe();
        let _ = rx.wait_for(TriggerSession::is_terminal).await;
        debug!(session = %slot.id, "controller shut down");
    }

    // ── Dispatch ─────────────────────────────────────────────────

    async fn dispatch(&self, slot: &ActiveSlot) {
        info!(session = %slot.id, "countdown elapsed, dispatching alert");

        let (location, location_error) = self.acquire_location().await;
        slot.state.send_modify(|s| {
            s.location = location;
            s.location_error.clone_from(&location_error);
        });

        // Built once so every retry carries the same session id and timestamp.
        let payload = AlertPayload {
            session_id: slot.id.to_string(),
            location: location.map(Into::into),
            trigger_type: slot.state.borrow().trigger_type,
            timestamp: Utc::now(),
        };

        let (next, result) = match self.submit_with_retry(slot, &payload).await {
            Ok(receipt) => {
                info!(
                    session = %slot.id,
                    alert_id = %receipt.alert_id,
                    notified = receipt.notified_contacts,
                    "alert confirmed"
                );
                (SessionState::Confirmed, DispatchResult::Confirmed(receipt))
            }
            Err((err, attempts)) => {
                error!(session = %slot.id, attempts, error = %err, "alert dispatch failed");
                (
                    SessionState::Failed,
                    DispatchResult::Failed(DispatchFailure::from_error(&err, attempts)),
                )
            }
        };

        let log = &self.inner.log;
        slot.state.send_if_modified(|s| {
            if !s.transition(next) {
                return false;
            }
            s.dispatch_result = Some(result);
            log.record(s.clone());
            true
        });
    }

    async fn acquire_location(&self) -> (Option<Coordinate>, Option<LocationError>) {
        let budget = self.inner.config.location_timeout;
        let request = self.inner.location.current_location(budget);

        match tokio::time::timeout(budget, request).await {
            Ok(Ok(coordinate)) => {
                debug!(%coordinate, "location acquired");
                (Some(coordinate), None)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "location unavailable, dispatching without it");
                (None, Some(e))
            }
            Err(_) => {
                let e = LocationError::timed_out(budget);
                warn!(error = %e, "location timed out, dispatching without it");
                (None, Some(e))
            }
        }
    }

    /// Submit with bounded retries. On failure returns the last error and
    /// the number of attempts made.
    async fn submit_with_retry(
        &self,
        slot: &ActiveSlot,
        payload: &AlertPayload,
    ) -> Result<AlertReceipt, (CoreError, u32)> {
        let config = &self.inner.config;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            slot.state.send_modify(|s| s.attempts = attempt);

            let submit = self.inner.transport.submit(payload);
            let err = match tokio::time::timeout(config.submit_timeout, submit).await {
                Ok(Ok(receipt)) => return Ok(receipt),
                Ok(Err(e)) => e,
                Err(_) => CoreError::TransportTimeout {
                    timeout_ms: duration_millis(config.submit_timeout),
                },
            };

            match config.retry.delay_after(attempt) {
                Some(delay) if err.is_retryable() => {
                    warn!(
                        session = %slot.id,
                        attempt,
                        retry_in_ms = duration_millis(delay),
                        error = %err,
                        "alert submission failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => return Err((err, attempt)),
            }
        }
    }
}

// ── Background task ──────────────────────────────────────────────

/// Publish the countdown until the deadline, then dispatch unless the
/// hold was released first.
async fn countdown_task<L: LocationProvider, T: AlertTransport>(
    controller: TriggerController<L, T>,
    slot: ActiveSlot,
) {
    let tick = controller.inner.config.tick_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = tokio::time::sleep_until(slot.deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            () = slot.timer.cancelled() => return,
            () = &mut deadline => break,
            _ = ticker.tick() => publish_remaining(&slot),
        }
    }

    if !claim_dispatch(&slot) {
        debug!(session = %slot.id, "countdown ended without dispatch");
        return;
    }
    controller.dispatch(&slot).await;
}

/// Move `Arming -> Dispatching`. Also true when a late release already
/// promoted the session, so the dispatch still runs exactly once.
fn claim_dispatch(slot: &ActiveSlot) -> bool {
    let mut claimed = false;
    slot.state.send_if_modified(|s| match s.state {
        SessionState::Arming => {
            claimed = s.transition(SessionState::Dispatching);
            claimed
        }
        SessionState::Dispatching => {
            claimed = true;
            false
        }
        _ => false,
    });
    claimed
}

fn publish_remaining(slot: &ActiveSlot) {
    let remaining = slot.deadline.saturating_duration_since(Instant::now());
    slot.state.send_if_modified(|s| {
        if s.state != SessionState::Arming || s.remaining == remaining {
            return false;
        }
        s.remaining = remaining;
        true
    });
}
