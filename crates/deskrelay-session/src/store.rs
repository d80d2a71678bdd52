//! The session store: every live session, by id and by code.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Creating sessions with a free six-digit code
//! - Seating a client, refusing when the host is gone or the seat is taken
//! - Suspending a role slot when its connection closes
//! - Restoring a suspended slot to a new connection
//! - Finalizing a slot whose grace period ran out
//!
//! # Concurrency note
//!
//! `SessionStore` is NOT thread-safe by itself. It is owned by the hub
//! actor and only touched from inside one command at a time, so a single
//! session's fields never see interleaved updates.

use std::collections::HashMap;
use std::time::SystemTime;

use deskrelay_protocol::{ConnectionId, Role, SessionCode, SessionId};
use rand::Rng;

use crate::{Session, SessionError, Slot, SlotState};

/// Codes are drawn from `100000..=999999`.
const CODE_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// How many draws `create` makes before giving up on finding a free code.
const MAX_CODE_DRAWS: usize = 64;

/// Result of a successful [`SessionStore::join`].
#[derive(Debug)]
pub struct Joined<'a> {
    /// The session, with the client slot now bound.
    pub session: &'a Session,
    /// The live host the client was paired with.
    pub host: ConnectionId,
    /// A stale client connection that was still named by the slot. Any
    /// grace timer armed for it must be cancelled.
    pub displaced: Option<ConnectionId>,
}

/// Result of a successful [`SessionStore::restore`].
#[derive(Debug)]
pub struct Restored<'a> {
    /// The session, with the slot rebound to the new connection.
    pub session: &'a Session,
    /// The connection that previously held the slot.
    pub displaced: ConnectionId,
}

/// What changed when a bound slot went offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineChange {
    /// The live connection on the other side, to be told.
    pub peer: Option<ConnectionId>,
    /// Control was on and has been forced off (client slots only).
    pub control_revoked: bool,
}

/// What a grace-period expiry finalized.
#[derive(Debug, Clone)]
pub enum Expiry {
    /// The host never came back; the whole session is gone.
    SessionRemoved {
        /// The removed record, so the caller can notify its client.
        session: Session,
    },
    /// The client never came back; its slot is free again.
    ClientCleared {
        /// The host, if bound, to be told.
        host: Option<ConnectionId>,
    },
}

/// What an explicit leave did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    /// The role the leaver held.
    pub role: Role,
    /// The live connection on the other side, to be told.
    pub peer: Option<ConnectionId>,
    /// The host left, so the session no longer exists.
    pub session_removed: bool,
    /// The client left while control was on.
    pub control_revoked: bool,
}

/// Holds every live session.
///
/// ## Lifecycle of a role slot
///
/// ```text
/// create()/join() ──→ mark_offline() ──→ restore()
///        │                  │                 │
///        ▼                  ▼                 ▼
///     [Bound]           [Offline]          [Bound]
///                           │
///                           ▼ (grace period ends)
///                        expire() ──→ host: session removed
///                                     client: slot emptied
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    /// All live sessions, keyed by their stable id.
    sessions: HashMap<SessionId, Session>,

    /// Index from the human code to the session id, kept in sync with
    /// `sessions`. A code appears here at most once.
    codes: HashMap<SessionCode, SessionId>,
}

impl SessionStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with `host` in the host slot.
    ///
    /// The code is re-drawn while it collides with a live session.
    ///
    /// # Errors
    /// Returns [`SessionError::CodeSpaceExhausted`] if every draw collided.
    pub fn create(&mut self, host: ConnectionId) -> Result<&Session, SessionError> {
        let mut rng = rand::rng();
        self.create_with(host, || rng.random_range(CODE_RANGE))
    }

    fn create_with(
        &mut self,
        host: ConnectionId,
        mut draw: impl FnMut() -> u32,
    ) -> Result<&Session, SessionError> {
        let code = (0..MAX_CODE_DRAWS)
            .map(|_| SessionCode(format!("{:06}", draw())))
            .find(|code| !self.codes.contains_key(code))
            .ok_or(SessionError::CodeSpaceExhausted)?;

        let id = loop {
            let id = SessionId(generate_id());
            if !self.sessions.contains_key(&id) {
                break id;
            }
        };

        let session = Session {
            id: id.clone(),
            code: code.clone(),
            host: Slot::bound(host),
            client: Slot::default(),
            control_enabled: false,
            created_at: SystemTime::now(),
        };

        tracing::info!(session_id = %id, %code, %host, "session created");

        self.codes.insert(code, id.clone());
        Ok(&*self.sessions.entry(id).or_insert(session))
    }

    /// Removes the session with this code if it is an orphan: its host
    /// slot is empty or names a dead connection that is not in a grace
    /// period. Returns the removed session so its client can be released.
    pub fn reap_orphan(
        &mut self,
        code: &SessionCode,
        is_live: impl Fn(ConnectionId) -> bool,
    ) -> Option<Session> {
        let id = self.codes.get(code)?.clone();
        let orphaned = match self.sessions.get(&id)?.host.state() {
            SlotState::Bound(host) => !is_live(host),
            SlotState::Offline(_) => false,
            SlotState::Empty => true,
        };
        if !orphaned {
            return None;
        }
        tracing::info!(session_id = %id, "removing orphaned session");
        self.remove(&id)
    }

    /// Seats `client` in the session with this code.
    ///
    /// `is_live` answers whether a connection id still resolves in the
    /// connection registry. Orphans are refused but kept; see
    /// [`reap_orphan`](Self::reap_orphan).
    ///
    /// # Errors
    /// - [`SessionError::InvalidCode`] — no session has this code
    /// - [`SessionError::HostUnavailable`] — the host is not reachable
    /// - [`SessionError::SlotOccupied`] — a live client is already seated
    pub fn join(
        &mut self,
        code: &SessionCode,
        client: ConnectionId,
        is_live: impl Fn(ConnectionId) -> bool,
    ) -> Result<Joined<'_>, SessionError> {
        let id = self
            .codes
            .get(code)
            .cloned()
            .ok_or_else(|| SessionError::InvalidCode(code.clone()))?;
        let (host_state, client_state) = self
            .sessions
            .get(&id)
            .map(|s| (s.host.state(), s.client.state()))
            .ok_or_else(|| SessionError::InvalidCode(code.clone()))?;

        let host = match host_state {
            SlotState::Bound(host) if is_live(host) => host,
            _ => return Err(SessionError::HostUnavailable(id)),
        };

        let displaced = match client_state {
            SlotState::Bound(existing) if is_live(existing) => {
                return Err(SessionError::SlotOccupied(id));
            }
            SlotState::Bound(stale) | SlotState::Offline(stale) => Some(stale),
            SlotState::Empty => None,
        };

        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::InvalidCode(code.clone()))?;
        session.client = Slot::bound(client);

        tracing::info!(session_id = %id, %client, "client joined");
        Ok(Joined {
            session,
            host,
            displaced,
        })
    }

    /// Marks the `role` slot offline because `conn` closed.
    ///
    /// Returns `None` (and changes nothing) when the slot does not hold
    /// `conn` as a bound connection, which makes a repeated or late close
    /// a no-op. A client going offline forces control off.
    pub fn mark_offline(
        &mut self,
        id: &SessionId,
        role: Role,
        conn: ConnectionId,
    ) -> Option<OfflineChange> {
        let session = self.sessions.get_mut(id)?;
        if session.slot(role).state() != SlotState::Bound(conn) {
            return None;
        }
        session.slot_mut(role).offline = true;

        let control_revoked = role == Role::Client && session.control_enabled;
        if role == Role::Client {
            session.control_enabled = false;
        }

        tracing::info!(session_id = %id, %role, %conn, "slot offline");
        Some(OfflineChange {
            peer: session.peer_of(role),
            control_revoked,
        })
    }

    /// Rebinds the `role` slot of the session with this code to `conn`.
    ///
    /// # Errors
    /// - [`SessionError::InvalidCode`] — no session has this code
    /// - [`SessionError::RoleAlreadyOccupied`] — a live connection holds it
    /// - [`SessionError::NothingToRestore`] — the slot is empty
    pub fn restore(
        &mut self,
        code: &SessionCode,
        role: Role,
        conn: ConnectionId,
        is_live: impl Fn(ConnectionId) -> bool,
    ) -> Result<Restored<'_>, SessionError> {
        let id = self
            .codes
            .get(code)
            .cloned()
            .ok_or_else(|| SessionError::InvalidCode(code.clone()))?;
        let state = self
            .sessions
            .get(&id)
            .map(|s| s.slot(role).state())
            .ok_or_else(|| SessionError::InvalidCode(code.clone()))?;

        let displaced = match state {
            SlotState::Empty => return Err(SessionError::NothingToRestore(role)),
            SlotState::Bound(existing) if is_live(existing) => {
                return Err(SessionError::RoleAlreadyOccupied(role));
            }
            SlotState::Bound(stale) | SlotState::Offline(stale) => stale,
        };

        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::InvalidCode(code.clone()))?;
        *session.slot_mut(role) = Slot::bound(conn);

        tracing::info!(session_id = %id, %role, %conn, old = %displaced, "slot restored");
        Ok(Restored {
            session,
            displaced,
        })
    }

    /// Finalizes the `role` slot if it is still offline and still names
    /// `stale`.
    ///
    /// Returns `None` when the slot was reclaimed in the meantime (or the
    /// session is already gone), so a late timer cannot clobber a newer
    /// connection.
    pub fn expire(
        &mut self,
        id: &SessionId,
        role: Role,
        stale: ConnectionId,
    ) -> Option<Expiry> {
        let state = self.sessions.get(id)?.slot(role).state();
        if state != SlotState::Offline(stale) {
            return None;
        }

        match role {
            Role::Host => {
                let session = self.remove(id)?;
                tracing::info!(session_id = %id, "host grace period elapsed, session removed");
                Some(Expiry::SessionRemoved { session })
            }
            Role::Client => {
                let session = self.sessions.get_mut(id)?;
                session.client.clear();
                session.control_enabled = false;
                tracing::info!(session_id = %id, "client grace period elapsed, slot cleared");
                Some(Expiry::ClientCleared {
                    host: session.host.active(),
                })
            }
        }
    }

    /// Sets the control gate. Only the bound host may do this.
    ///
    /// # Errors
    /// - [`SessionError::UnknownSession`] — no session has this id
    /// - [`SessionError::NotHost`] — `sender` is not the bound host
    pub fn set_control(
        &mut self,
        id: &SessionId,
        sender: ConnectionId,
        enabled: bool,
    ) -> Result<&Session, SessionError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
        if session.host.active() != Some(sender) {
            return Err(SessionError::NotHost(id.clone()));
        }
        session.control_enabled = enabled;
        tracing::info!(session_id = %id, enabled, "control toggled");
        Ok(&*session)
    }

    /// Resolves a session and the role `sender` holds in it.
    ///
    /// # Errors
    /// - [`SessionError::UnknownSession`] — no session has this id
    /// - [`SessionError::NotInSession`] — `sender` holds no bound slot
    pub fn member(
        &self,
        id: &SessionId,
        sender: ConnectionId,
    ) -> Result<(&Session, Role), SessionError> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
        let role = session
            .role_of(sender)
            .ok_or_else(|| SessionError::NotInSession(id.clone()))?;
        Ok((session, role))
    }

    /// Removes `conn` from the session at its own request.
    ///
    /// The host leaving ends the session; the client leaving frees its
    /// slot and forces control off.
    ///
    /// # Errors
    /// - [`SessionError::UnknownSession`] — no session has this id
    /// - [`SessionError::NotInSession`] — `conn` holds no bound slot
    pub fn leave(
        &mut self,
        id: &SessionId,
        conn: ConnectionId,
    ) -> Result<Departure, SessionError> {
        let role = self.member(id, conn)?.1;

        let departure = match role {
            Role::Host => {
                let session = self
                    .remove(id)
                    .ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
                Departure {
                    role,
                    peer: session.client.active(),
                    session_removed: true,
                    control_revoked: false,
                }
            }
            Role::Client => {
                let session = self
                    .sessions
                    .get_mut(id)
                    .ok_or_else(|| SessionError::UnknownSession(id.clone()))?;
                let control_revoked = session.control_enabled;
                session.client.clear();
                session.control_enabled = false;
                Departure {
                    role,
                    peer: session.host.active(),
                    session_removed: false,
                    control_revoked,
                }
            }
        };

        tracing::info!(session_id = %id, %role, %conn, "participant left");
        Ok(departure)
    }

    /// Removes a session and its code entry.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        if self.codes.get(&session.code) == Some(id) {
            self.codes.remove(&session.code);
        }
        Some(session)
    }

    /// Looks up a session by id.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Looks up a session by its human code.
    pub fn get_by_code(&self, code: &SessionCode) -> Option<&Session> {
        self.codes.get(code).and_then(|id| self.sessions.get(id))
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
