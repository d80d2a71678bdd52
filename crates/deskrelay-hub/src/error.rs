//! Error types for the hub layer.

use deskrelay_protocol::{ConnectionId, ErrorCode, SessionId};
use deskrelay_session::SessionError;

/// Errors that can occur while the hub handles a request.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The session store refused the request.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The connection already holds a role in some session.
    #[error("{0} is already bound to a session")]
    AlreadyInSession(ConnectionId),

    /// The other party of the session is not reachable right now.
    #[error("peer in session {0} is not connected")]
    PeerNotConnected(SessionId),

    /// The host has not enabled control events.
    #[error("control is not enabled in session {0}")]
    ControlNotEnabled(SessionId),

    /// The hub's command channel is closed.
    #[error("hub is unavailable")]
    Unavailable,
}

impl HubError {
    /// The wire code to report back to the sender, if any.
    ///
    /// [`HubError::Unavailable`] is a server-side condition and has none.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            HubError::Session(e) => Some(e.code()),
            HubError::AlreadyInSession(_) => Some(ErrorCode::AlreadyInSession),
            HubError::PeerNotConnected(_) => Some(ErrorCode::PeerNotConnected),
            HubError::ControlNotEnabled(_) => Some(ErrorCode::ControlNotEnabled),
            HubError::Unavailable => None,
        }
    }
}
