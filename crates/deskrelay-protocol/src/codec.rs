//! JSON codec for relay messages.
//!
//! Encoding is plain `serde_json`. Decoding goes through an intermediate
//! [`serde_json::Value`] so a failure can be classified precisely: the
//! relay answers "not JSON", "unknown type" and "bad fields" with
//! different error codes, and serde's own error for an internally tagged
//! enum does not tell those apart.

use serde_json::Value;

use crate::{ClientMessage, ProtocolError, ServerMessage};

/// Converts [`ServerMessage`]s to text and text to [`ClientMessage`]s.
///
/// ```rust
/// use deskrelay_protocol::{ClientMessage, JsonCodec, ProtocolError};
///
/// let codec = JsonCodec;
///
/// let msg = codec.decode(br#"{"type":"create-session"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::CreateSession);
///
/// let err = codec.decode(br#"{"type":"fly-to-moon"}"#).unwrap_err();
/// assert!(matches!(err, ProtocolError::UnknownType(_)));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Serializes a message into a JSON string, ready for a text frame.
    pub fn encode(&self, msg: &ServerMessage) -> Result<String, ProtocolError> {
        serde_json::to_string(msg).map_err(ProtocolError::Encode)
    }

    /// Parses one inbound frame.
    ///
    /// # Errors
    /// - [`ProtocolError::Decode`] — the bytes are not JSON
    /// - [`ProtocolError::UnknownType`] — no usable `type` field
    /// - [`ProtocolError::InvalidMessage`] — known `type`, wrong fields
    pub fn decode(&self, data: &[u8]) -> Result<ClientMessage, ProtocolError> {
        let value: Value =
            serde_json::from_slice(data).map_err(ProtocolError::Decode)?;

        let kind = match value.get("type").and_then(Value::as_str) {
            Some(kind) => kind,
            None => {
                return Err(ProtocolError::UnknownType(
                    "<missing>".to_string(),
                ));
            }
        };
        if !ClientMessage::KINDS.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }

        serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}
