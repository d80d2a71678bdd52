//! Session types: the record of one host/client pairing.
//!
//! A session tracks:
//! - WHO holds each role slot (a connection id, possibly stale)
//! - WHETHER a vacant slot is waiting for its owner to come back
//! - WHAT the host has allowed (the control gate)

use std::time::{Duration, SystemTime};

use deskrelay_protocol::{ConnectionId, Role, SessionCode, SessionId};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected host or client has to
    /// reconnect before its slot is finalized.
    ///
    /// Default: 120 seconds. Set to 0 to finalize immediately on close.
    pub reconnect_grace_secs: u64,
}

impl SessionConfig {
    /// The grace period as a `Duration`.
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.reconnect_grace_secs)
    }

    /// Whether disconnected slots wait for their owner at all.
    pub fn grace_enabled(&self) -> bool {
        self.reconnect_grace_secs > 0
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// One role slot of a session.
///
/// `connection` is a weak reference: the id may name a connection that has
/// already gone away. An offline slot keeps naming the connection that
/// dropped, so a grace timer armed for that connection can tell whether the
/// slot has since been reclaimed by someone else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    /// The connection last bound to this slot, if any.
    pub connection: Option<ConnectionId>,
    /// The bound connection closed and a grace period is running.
    pub offline: bool,
}

/// The state of a slot as the store sees it.
///
/// ```text
///   Bound ──(close)──→ Offline ──(grace expires)──→ Empty
///     ↑                   │
///     └────(reconnect)────┘
/// ```
///
/// Whether a `Bound` connection is actually reachable is only known to the
/// connection registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nobody has held this slot, or it was finalized.
    Empty,
    /// Held by this connection.
    Bound(ConnectionId),
    /// This connection dropped; waiting for a reconnect.
    Offline(ConnectionId),
}

impl Slot {
    /// A slot held by `conn`.
    pub fn bound(conn: ConnectionId) -> Self {
        Self {
            connection: Some(conn),
            offline: false,
        }
    }

    /// Classifies the slot.
    pub fn state(&self) -> SlotState {
        match (self.connection, self.offline) {
            (None, _) => SlotState::Empty,
            (Some(conn), false) => SlotState::Bound(conn),
            (Some(conn), true) => SlotState::Offline(conn),
        }
    }

    /// The connection if the slot is bound and not offline.
    pub fn active(&self) -> Option<ConnectionId> {
        match self.state() {
            SlotState::Bound(conn) => Some(conn),
            _ => None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.connection = None;
        self.offline = false;
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One sharing relationship between a host and at most one client.
///
/// Created by `create-session`, lives until the host's slot is finalized
/// (grace expiry or explicit leave).
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable internal id; all signaling after join addresses this.
    pub id: SessionId,

    /// Six-digit code the host shares with the client.
    pub code: SessionCode,

    /// The host slot.
    pub host: Slot,

    /// The client slot.
    pub client: Slot,

    /// Host-controlled gate for forwarding control events.
    pub control_enabled: bool,

    /// When the session was created.
    pub created_at: SystemTime,
}

impl Session {
    /// Borrows the slot for a role.
    pub fn slot(&self, role: Role) -> &Slot {
        match role {
            Role::Host => &self.host,
            Role::Client => &self.client,
        }
    }

    pub(crate) fn slot_mut(&mut self, role: Role) -> &mut Slot {
        match role {
            Role::Host => &mut self.host,
            Role::Client => &mut self.client,
        }
    }

    /// Which role `conn` currently holds here, if any.
    ///
    /// Offline slots do not count: the connection they name is gone.
    pub fn role_of(&self, conn: ConnectionId) -> Option<Role> {
        if self.host.active() == Some(conn) {
            Some(Role::Host)
        } else if self.client.active() == Some(conn) {
            Some(Role::Client)
        } else {
            None
        }
    }

    /// The connection on the other side from `role`, if bound.
    pub fn peer_of(&self, role: Role) -> Option<ConnectionId> {
        self.slot(role.other()).active()
    }

    /// Every connection currently bound to the session.
    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.host.active().into_iter().chain(self.client.active())
    }
}
