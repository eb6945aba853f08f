// ── Session subscriptions ──
//
// A `SessionHandle` is what `begin` hands back: the session id plus a
// watch receiver that follows every transition and countdown tick.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::{SessionId, TriggerSession};

/// Live view of one trigger session.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    receiver: watch::Receiver<TriggerSession>,
}

impl SessionHandle {
    pub(crate) fn new(receiver: watch::Receiver<TriggerSession>) -> Self {
        let id = receiver.borrow().id;
        Self { id, receiver }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Latest snapshot.
    pub fn current(&self) -> TriggerSession {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update. Returns `None` once the controller has
    /// released the session and no further updates can arrive.
    pub async fn changed(&mut self) -> Option<TriggerSession> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the session is `Cancelled`, `Confirmed`, or `Failed`.
    pub async fn wait_terminal(&mut self) -> TriggerSession {
        if let Ok(session) = self.receiver.wait_for(TriggerSession::is_terminal).await {
            return session.clone();
        }
        self.receiver.borrow().clone()
    }

    /// Convert into a `Stream` of snapshots, starting with the current one.
    pub fn into_stream(self) -> SessionStream {
        SessionStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a session's watch channel.
pub struct SessionStream {
    inner: WatchStream<TriggerSession>,
}

impl Stream for SessionStream {
    type Item = TriggerSession;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
