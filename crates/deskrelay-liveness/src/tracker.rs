//! Per-connection answered flags.

use std::collections::HashMap;

use deskrelay_transport::ConnectionId;
use tracing::warn;

/// The outcome of one probe round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sweep {
    /// Connections that never answered the previous probe. They are no
    /// longer tracked; the caller must run them through the close path.
    pub terminate: Vec<ConnectionId>,
    /// Connections to ping now. Their flags are cleared until a pong.
    pub probe: Vec<ConnectionId>,
}

/// Remembers which connections answered the last probe.
///
/// A freshly tracked connection counts as having answered, so it always
/// gets one full interval before it can be terminated.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    answered: HashMap<ConnectionId, bool>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching a connection.
    pub fn track(&mut self, conn: ConnectionId) {
        self.answered.insert(conn, true);
    }

    /// Stop watching a connection (it closed).
    pub fn forget(&mut self, conn: ConnectionId) {
        self.answered.remove(&conn);
    }

    /// A pong arrived. Unknown connections are ignored.
    pub fn record_pong(&mut self, conn: ConnectionId) {
        if let Some(flag) = self.answered.get_mut(&conn) {
            *flag = true;
        }
    }

    /// Run one probe round over every tracked connection.
    ///
    /// Both lists come back sorted by connection id.
    pub fn sweep(&mut self) -> Sweep {
        let mut sweep = Sweep::default();
        for (&conn, answered) in self.answered.iter_mut() {
            if *answered {
                *answered = false;
                sweep.probe.push(conn);
            } else {
                sweep.terminate.push(conn);
            }
        }
        for conn in &sweep.terminate {
            warn!(%conn, "no answer to previous probe, terminating");
            self.answered.remove(conn);
        }
        sweep.terminate.sort_unstable();
        sweep.probe.sort_unstable();
        sweep
    }

    /// Number of watched connections.
    pub fn len(&self) -> usize {
        self.answered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answered.is_empty()
    }
}
