//! Error types for the protocol layer.
//!
//! Decoding distinguishes three ways an inbound frame can be wrong, because
//! each maps to a different wire code: not JSON at all, JSON without a
//! recognizable `type`, or a recognized `type` with unusable fields.

use crate::ErrorCode;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into text).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame is not valid JSON.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The `type` field is missing, not a string, or names nothing we know.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The `type` is known but the message does not fit its shape.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ProtocolError {
    /// The wire code to report back to the sender.
    pub fn code(&self) -> ErrorCode {
        match self {
            // An encode failure is ours, not the client's; it never reaches
            // the wire as anything more specific than a bad message.
            ProtocolError::Encode(_) | ProtocolError::InvalidMessage(_) => {
                ErrorCode::InvalidMessage
            }
            ProtocolError::Decode(_) => ErrorCode::InvalidJson,
            ProtocolError::UnknownType(_) => ErrorCode::UnknownType,
        }
    }
}
