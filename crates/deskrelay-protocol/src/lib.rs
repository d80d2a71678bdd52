//! Wire protocol for deskrelay.
//!
//! This crate defines the language participants and the relay speak:
//!
//! - **Types** ([`SessionCode`], [`SessionId`], [`Role`], [`ErrorCode`]) —
//!   identifiers and reasons that appear inside messages.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — the JSON
//!   documents that cross the connection.
//! - **Codec** ([`JsonCodec`]) — text ⇄ message, with errors classified
//!   the way the relay reports them.
//!
//! ```text
//! Transport (text frames) → Protocol (messages) → Hub (sessions, routing)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientMessage, ServerMessage};
pub use types::{ErrorCode, Role, SessionCode, SessionId};

pub use deskrelay_transport::ConnectionId;
