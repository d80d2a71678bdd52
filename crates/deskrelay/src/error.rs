//! Unified error type for deskrelay.

use deskrelay_hub::HubError;
use deskrelay_protocol::ProtocolError;
use deskrelay_session::SessionError;
use deskrelay_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `deskrelay` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DeskRelayError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (bad code, slot taken, nothing to restore).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The hub refused a request or is gone.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The environment held an unusable setting.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
