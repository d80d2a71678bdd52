//! # deskrelay
//!
//! Rendezvous and signaling relay for peer-to-peer remote-desktop
//! sessions.
//!
//! A **host** creates a session and reads its six-digit code to a
//! **client**. The relay pairs them, forwards WebRTC offers, answers and
//! ICE candidates until the peer connection is up, and gates
//! remote-control events behind a host-owned switch. A participant that
//! drops can reclaim its seat within a grace period without losing the
//! session or its control setting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deskrelay::prelude::*;
//!
//! # async fn start() -> Result<(), DeskRelayError> {
//! let config = ServerConfig::from_env()?;
//! let server = DeskRelayServerBuilder::from_config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::DeskRelayError;
pub use server::{DeskRelayServer, DeskRelayServerBuilder};

pub mod prelude {
    pub use crate::{
        ConfigError, DeskRelayError, DeskRelayServer, DeskRelayServerBuilder, ServerConfig,
    };
    pub use deskrelay_hub::{HubHandle, HubStats};
    pub use deskrelay_liveness::LivenessConfig;
    pub use deskrelay_protocol::{
        ClientMessage, ConnectionId, ErrorCode, Role, ServerMessage, SessionCode, SessionId,
    };
    pub use deskrelay_session::SessionConfig;
}
