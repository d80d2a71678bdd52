//! Connection registry: who is reachable, and where they sit.

use std::collections::HashMap;

use deskrelay_protocol::{ConnectionId, Role, ServerMessage, SessionId};
use tokio::sync::mpsc;

/// Something the hub wants a connection handler to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Encode and send this message.
    Message(ServerMessage),
    /// Send a liveness probe.
    Ping,
    /// Close the socket; the connection was terminated.
    Close,
}

/// Channel sender for delivering outbound work to a connection handler.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// The session slot a connection currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Binding {
    pub(crate) session_id: SessionId,
    pub(crate) role: Role,
}

#[derive(Debug)]
pub(crate) struct Entry {
    sender: OutboundSender,
    pub(crate) binding: Option<Binding>,
}

/// Every open connection, keyed by id.
///
/// The only place allowed to answer "is this peer still reachable": a
/// connection is live while it is registered and its handler still holds
/// the receiving end of its outbound channel.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    entries: HashMap<ConnectionId, Entry>,
}

impl ConnectionRegistry {
    pub(crate) fn insert(&mut self, conn: ConnectionId, sender: OutboundSender) {
        self.entries.insert(
            conn,
            Entry {
                sender,
                binding: None,
            },
        );
    }

    pub(crate) fn remove(&mut self, conn: ConnectionId) -> Option<Entry> {
        self.entries.remove(&conn)
    }

    pub(crate) fn contains(&self, conn: ConnectionId) -> bool {
        self.entries.contains_key(&conn)
    }

    pub(crate) fn is_live(&self, conn: ConnectionId) -> bool {
        self.entries
            .get(&conn)
            .is_some_and(|entry| !entry.sender.is_closed())
    }

    pub(crate) fn binding(&self, conn: ConnectionId) -> Option<&Binding> {
        self.entries.get(&conn).and_then(|e| e.binding.as_ref())
    }

    pub(crate) fn bind(&mut self, conn: ConnectionId, session_id: SessionId, role: Role) {
        if let Some(entry) = self.entries.get_mut(&conn) {
            entry.binding = Some(Binding { session_id, role });
        }
    }

    pub(crate) fn unbind(&mut self, conn: ConnectionId) {
        if let Some(entry) = self.entries.get_mut(&conn) {
            entry.binding = None;
        }
    }

    /// Queues a message for one connection. Returns `false` if it is gone.
    ///
    /// Fire-and-forget: nothing is buffered for a connection that is not
    /// registered.
    pub(crate) fn send(&self, conn: ConnectionId, msg: ServerMessage) -> bool {
        self.push(conn, Outbound::Message(msg))
    }

    pub(crate) fn push(&self, conn: ConnectionId, outbound: Outbound) -> bool {
        match self.entries.get(&conn) {
            Some(entry) => entry.sender.send(outbound).is_ok(),
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
