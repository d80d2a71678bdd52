//! The coordinating actor of deskrelay.
//!
//! One Tokio task (the hub) owns every piece of mutable relay state and
//! processes one command at a time:
//!
//! - the **connection registry**: which connections are reachable
//! - the **session store**: who is paired with whom
//! - the **reconnection supervisor**: grace timers for vacated slots
//! - the **liveness monitor**: probe rounds and answered flags
//!
//! # Key types
//!
//! - [`spawn_hub`] — starts the actor
//! - [`HubHandle`] — send commands to the running hub
//! - [`Outbound`] — what the hub asks a connection handler to do
//! - [`HubConfig`] — grace period, probe interval, channel size

mod config;
mod error;
mod hub;
mod registry;
mod router;
mod supervisor;

pub use config::HubConfig;
pub use error::HubError;
pub use hub::{HubHandle, HubStats, spawn_hub};
pub use registry::{Outbound, OutboundSender};
