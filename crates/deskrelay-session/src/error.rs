//! Error types for the session layer.

use deskrelay_protocol::{ErrorCode, Role, SessionCode, SessionId};

/// Errors that can occur during session management.
///
/// Every variant is a protocol precondition the sender violated; none of
/// them mutate the store. [`SessionError::code`] gives the wire code.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session has this code.
    #[error("no session with code {0}")]
    InvalidCode(SessionCode),

    /// The session's host connection cannot be resolved.
    #[error("host of session {0} is not available")]
    HostUnavailable(SessionId),

    /// A live client already holds the client slot.
    #[error("session {0} already has a client")]
    SlotOccupied(SessionId),

    /// No live session has this id.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// The sender is not the session's host.
    #[error("only the host of session {0} may do this")]
    NotHost(SessionId),

    /// The sender is neither host nor client of the session.
    #[error("not a member of session {0}")]
    NotInSession(SessionId),

    /// A live connection already holds the role being reclaimed.
    #[error("{0} slot is already occupied")]
    RoleAlreadyOccupied(Role),

    /// The role slot was never occupied, or has already been finalized.
    #[error("no pending {0} to restore")]
    NothingToRestore(Role),

    /// Every drawn code was in use.
    #[error("could not draw a free session code")]
    CodeSpaceExhausted,
}

impl SessionError {
    /// The wire code to report back to the sender.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::InvalidCode(_) => ErrorCode::InvalidSessionCode,
            SessionError::HostUnavailable(_) => ErrorCode::HostNotAvailable,
            SessionError::SlotOccupied(_) => ErrorCode::SessionAlreadyHasClient,
            SessionError::UnknownSession(_) => ErrorCode::UnknownSession,
            SessionError::NotHost(_) => ErrorCode::NotHost,
            SessionError::NotInSession(_) => ErrorCode::NotInSession,
            SessionError::RoleAlreadyOccupied(_) => ErrorCode::RoleAlreadyOccupied,
            SessionError::NothingToRestore(_) => ErrorCode::NothingToRestore,
            SessionError::CodeSpaceExhausted => ErrorCode::SessionLimitReached,
        }
    }
}
