// ── Session log ──
//
// Bounded record of recent sessions, newest first. Snapshots are shared
// through a `watch` channel so readers never block the controller.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{SessionId, TriggerSession};

pub type SessionSnapshot = Arc<VecDeque<TriggerSession>>;

/// Sessions that reached a terminal state, capped at `limit` entries.
pub struct SessionLog {
    sessions: watch::Sender<SessionSnapshot>,
    limit: usize,
}

impl SessionLog {
    pub fn new(limit: usize) -> Self {
        let (sessions, _) = watch::channel(Arc::new(VecDeque::new()));
        Self { sessions, limit }
    }

    /// Record a session, replacing an earlier entry with the same id.
    pub fn record(&self, session: TriggerSession) {
        let limit = self.limit;
        self.sessions.send_modify(|snapshot| {
            let entries = Arc::make_mut(snapshot);
            entries.retain(|s| s.id != session.id);
            entries.push_front(session);
            entries.truncate(limit);
        });
    }

    pub fn get(&self, id: &SessionId) -> Option<TriggerSession> {
        self.sessions.borrow().iter().find(|s| s.id == *id).cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.sessions.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.sessions.subscribe()
    }

    pub fn len(&self) -> usize {
        self.sessions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lifeline_api::TriggerType;

    use super::*;
    use crate::model::SessionState;

    fn session() -> TriggerSession {
        TriggerSession::arming(TriggerType::Manual, Duration::from_secs(3))
    }

    #[test]
    fn newest_first_and_bounded() {
        let log = SessionLog::new(2);
        let (a, b, c) = (session(), session(), session());
        let c_id = c.id;
        let b_id = b.id;

        log.record(a);
        log.record(b);
        log.record(c);

        let snap = log.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].id, c_id);
        assert_eq!(snap[1].id, b_id);
    }

    #[test]
    fn re_recording_replaces_entry() {
        let log = SessionLog::new(5);
        let mut s = session();
        let id = s.id;
        log.record(s.clone());

        s.transition(SessionState::Cancelled);
        log.record(s);

        assert_eq!(log.len(), 1);
        assert_eq!(log.get(&id).map(|s| s.state), Some(SessionState::Cancelled));
    }

    #[test]
    fn subscribers_see_updates() {
        let log = SessionLog::new(5);
        let mut rx = log.subscribe();
        assert!(!rx.has_changed().unwrap_or(true));

        log.record(session());

        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
