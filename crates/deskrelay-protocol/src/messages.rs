//! Signaling messages exchanged between participants and the relay.
//!
//! Every message is a JSON object with a `type` discriminator, e.g.
//!
//! ```text
//! {"type": "join-session", "sessionCode": "482193"}
//! {"type": "offer", "sessionId": "9f1c…", "offer": {"sdp": "…"}}
//! ```
//!
//! `#[serde(tag = "type")]` produces that internally tagged shape,
//! `rename_all = "kebab-case"` spells the tags, and
//! `rename_all_fields = "camelCase"` spells the fields the way browser
//! clients write them.

use deskrelay_transport::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ErrorCode, Role, SessionCode, SessionId};

// ---------------------------------------------------------------------------
// Client → relay
// ---------------------------------------------------------------------------

/// A message sent by a participant to the relay.
///
/// Signaling payloads (`offer`, `answer`, `candidate`) and control
/// `event`s are opaque: the relay forwards them without looking inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Start a new session with the sender as host.
    CreateSession,

    /// Join an existing session as its client.
    JoinSession { session_code: SessionCode },

    /// Reclaim a role slot left vacant by an abrupt disconnect.
    #[serde(alias = "restore-session")]
    ReconnectSession { session_code: SessionCode, role: Role },

    /// Leave the session deliberately, without a grace period.
    LeaveSession { session_id: SessionId },

    /// WebRTC offer for the other party.
    Offer { session_id: SessionId, offer: Value },

    /// WebRTC answer for the other party.
    Answer { session_id: SessionId, answer: Value },

    /// ICE candidate for the other party.
    IceCandidate { session_id: SessionId, candidate: Value },

    /// Host only: allow or forbid control events.
    ToggleControl { session_id: SessionId, enabled: bool },

    /// A remote-control event (pointer, keyboard, …) for the other party.
    ControlEvent { session_id: SessionId, event: Value },
}

impl ClientMessage {
    /// Every `type` tag a client may send, aliases included.
    pub const KINDS: &'static [&'static str] = &[
        "create-session",
        "join-session",
        "reconnect-session",
        "restore-session",
        "leave-session",
        "offer",
        "answer",
        "ice-candidate",
        "toggle-control",
        "control-event",
    ];
}

// ---------------------------------------------------------------------------
// Relay → client
// ---------------------------------------------------------------------------

/// A message sent by the relay to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message on every connection: "this is who you are".
    Connected { client_id: ConnectionId },

    /// Reply to `create-session`.
    SessionCreated {
        session_code: SessionCode,
        session_id: SessionId,
    },

    /// Reply to a successful `join-session`.
    SessionJoined {
        session_id: SessionId,
        host_id: ConnectionId,
    },

    /// To the host: a client has joined.
    ClientJoined { client_id: ConnectionId },

    /// Reply to a successful `reconnect-session`.
    SessionRestored {
        session_id: SessionId,
        session_code: SessionCode,
        role: Role,
        control_enabled: bool,
        peer_connected: bool,
    },

    /// Reply to `leave-session`.
    SessionLeft { session_id: SessionId },

    /// Relayed offer. `from` is the sender's connection id.
    Offer {
        session_id: SessionId,
        offer: Value,
        from: ConnectionId,
    },

    /// Relayed answer.
    Answer {
        session_id: SessionId,
        answer: Value,
        from: ConnectionId,
    },

    /// Relayed ICE candidate.
    IceCandidate {
        session_id: SessionId,
        candidate: Value,
        from: ConnectionId,
    },

    /// The control gate changed (or was forced off).
    ControlStatus { enabled: bool },

    /// Relayed control event.
    ControlEvent { event: Value, from: ConnectionId },

    /// To the client: the host dropped; the session waits for it.
    HostOffline,

    /// To the client: the host is back within the grace period.
    HostReconnected { host_id: ConnectionId },

    /// To the client: the session is over.
    HostDisconnected,

    /// To the host: the client dropped; it may come back.
    ClientOffline,

    /// To the host: the client is back within the grace period.
    ClientReconnected { client_id: ConnectionId },

    /// To the host: the client slot is free again.
    ClientDisconnected,

    /// Something the sender asked for could not be done.
    Error { message: ErrorCode },
}

impl ServerMessage {
    /// Shorthand for an `error` reply.
    pub fn error(code: ErrorCode) -> Self {
        ServerMessage::Error { message: code }
    }
}
