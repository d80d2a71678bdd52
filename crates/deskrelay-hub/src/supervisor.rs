//! Reconnection supervisor: grace-period timers.
//!
//! Each timer is a spawned sleep task. When it wakes it posts its key
//! back on an internal channel; the hub receives it through
//! [`GraceTimers::next_expired`]. Cancelling aborts the task and forgets
//! the key, so an expiry that was already in flight when the cancel
//! happened is dropped on receipt instead of finalizing anything. Every
//! arm gets a fresh generation number, so a stale expiry cannot fire a
//! re-armed timer early either.

use std::collections::HashMap;
use std::time::Duration;

use deskrelay_protocol::{ConnectionId, Role, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Identifies one pending finalization: this role slot of this session,
/// vacated by this connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TimerKey {
    pub(crate) session_id: SessionId,
    pub(crate) role: Role,
    pub(crate) conn: ConnectionId,
}

struct Pending {
    generation: u64,
    task: JoinHandle<()>,
}

pub(crate) struct GraceTimers {
    grace: Duration,
    generation: u64,
    pending: HashMap<TimerKey, Pending>,
    expired_tx: mpsc::UnboundedSender<(TimerKey, u64)>,
    expired_rx: mpsc::UnboundedReceiver<(TimerKey, u64)>,
}

impl GraceTimers {
    pub(crate) fn new(grace: Duration) -> Self {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        Self {
            grace,
            generation: 0,
            pending: HashMap::new(),
            expired_tx,
            expired_rx,
        }
    }

    /// Starts the grace period for `key`, replacing any timer it had.
    pub(crate) fn arm(&mut self, key: TimerKey) {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.expired_tx.clone();
        let grace = self.grace;
        let fired = key.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send((fired, generation));
        });

        tracing::debug!(
            session_id = %key.session_id,
            role = %key.role,
            conn = %key.conn,
            grace_secs = grace.as_secs(),
            "grace timer armed"
        );
        if let Some(previous) = self.pending.insert(key, Pending { generation, task }) {
            previous.task.abort();
        }
    }

    /// Cancels every timer on one role slot of a session.
    pub(crate) fn cancel_slot(&mut self, session_id: &SessionId, role: Role) -> usize {
        self.cancel_where(|key| &key.session_id == session_id && key.role == role)
    }

    /// Cancels every timer belonging to a session.
    pub(crate) fn cancel_session(&mut self, session_id: &SessionId) -> usize {
        self.cancel_where(|key| &key.session_id == session_id)
    }

    fn cancel_where(&mut self, mut matches: impl FnMut(&TimerKey) -> bool) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|key, pending| {
            if matches(key) {
                pending.task.abort();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        if cancelled > 0 {
            tracing::debug!(cancelled, "grace timers cancelled");
        }
        cancelled
    }

    /// Waits for the next timer that is still pending to fire.
    ///
    /// Pends forever while nothing is armed.
    pub(crate) async fn next_expired(&mut self) -> TimerKey {
        loop {
            // `expired_tx` lives in `self`, so the channel never closes.
            let Some((key, generation)) = self.expired_rx.recv().await else {
                std::future::pending::<()>().await;
                continue;
            };
            let current = self
                .pending
                .get(&key)
                .is_some_and(|pending| pending.generation == generation);
            if current {
                self.pending.remove(&key);
                return key;
            }
            tracing::trace!(session_id = %key.session_id, "ignoring cancelled timer");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for GraceTimers {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.task.abort();
        }
    }
}
