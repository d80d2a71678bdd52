//! Identity types and error codes that travel on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short, human-shareable code a host reads out to a client.
///
/// Six decimal digits. Only used for the initial join and for
/// reconnection; everything after that is addressed by [`SessionId`].
/// Serialized as a plain string so leading context (a UI field, a chat
/// message) round-trips untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(pub String);

impl SessionCode {
    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// Stable internal identifier for a session.
///
/// Decouples signaling from the human code: a code may be reused after
/// its session is torn down, an id never is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Which slot of a session a participant occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The sharer. Creates the session and owns the control toggle.
    Host,
    /// The viewer/controller.
    Client,
}

impl Role {
    /// The role on the other side of the session.
    pub fn other(self) -> Role {
        match self {
            Role::Host => Role::Client,
            Role::Client => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Client => f.write_str("client"),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable reason carried by every `error` message.
///
/// Serialized in kebab-case, e.g. `ErrorCode::PeerNotConnected` becomes
/// `"peer-not-connected"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The frame was not JSON.
    InvalidJson,
    /// The `type` field was missing or named no known message.
    UnknownType,
    /// Known `type`, but the remaining fields did not fit it.
    InvalidMessage,
    /// No live session has this code.
    InvalidSessionCode,
    /// The session's host cannot be reached right now.
    HostNotAvailable,
    /// A live client already occupies the session.
    SessionAlreadyHasClient,
    /// No live session has this id.
    UnknownSession,
    /// The other party is not currently connected.
    PeerNotConnected,
    /// Only the host may do this.
    NotHost,
    /// Control events are gated off.
    ControlNotEnabled,
    /// The sender is not a member of the named session.
    NotInSession,
    /// The sender is already bound to a session.
    AlreadyInSession,
    /// A live connection already holds the role being reclaimed.
    RoleAlreadyOccupied,
    /// The role slot has no pending reconnection to claim.
    NothingToRestore,
    /// No free session code could be drawn.
    SessionLimitReached,
}

impl ErrorCode {
    /// The wire spelling of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidJson => "invalid-json",
            ErrorCode::UnknownType => "unknown-type",
            ErrorCode::InvalidMessage => "invalid-message",
            ErrorCode::InvalidSessionCode => "invalid-session-code",
            ErrorCode::HostNotAvailable => "host-not-available",
            ErrorCode::SessionAlreadyHasClient => "session-already-has-client",
            ErrorCode::UnknownSession => "unknown-session",
            ErrorCode::PeerNotConnected => "peer-not-connected",
            ErrorCode::NotHost => "not-host",
            ErrorCode::ControlNotEnabled => "control-not-enabled",
            ErrorCode::NotInSession => "not-in-session",
            ErrorCode::AlreadyInSession => "already-in-session",
            ErrorCode::RoleAlreadyOccupied => "role-already-occupied",
            ErrorCode::NothingToRestore => "nothing-to-restore",
            ErrorCode::SessionLimitReached => "session-limit-reached",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionCode::from("482193")).unwrap();
        assert_eq!(json, "\"482193\"");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
        let role: Role = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(role, Role::Client);
    }

    #[test]
    fn test_role_other_flips() {
        assert_eq!(Role::Host.other(), Role::Client);
        assert_eq!(Role::Client.other(), Role::Host);
    }

    #[test]
    fn test_error_code_serde_matches_as_str() {
        // `as_str` is what logs print; serde is what clients read. They
        // must never drift apart.
        let all = [
            ErrorCode::InvalidJson,
            ErrorCode::UnknownType,
            ErrorCode::InvalidMessage,
            ErrorCode::InvalidSessionCode,
            ErrorCode::HostNotAvailable,
            ErrorCode::SessionAlreadyHasClient,
            ErrorCode::UnknownSession,
            ErrorCode::PeerNotConnected,
            ErrorCode::NotHost,
            ErrorCode::ControlNotEnabled,
            ErrorCode::NotInSession,
            ErrorCode::AlreadyInSession,
            ErrorCode::RoleAlreadyOccupied,
            ErrorCode::NothingToRestore,
            ErrorCode::SessionLimitReached,
        ];
        for code in all {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
    }
}
