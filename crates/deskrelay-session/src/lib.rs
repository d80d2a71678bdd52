//! Host/client session management for deskrelay.
//!
//! This crate owns the durable half of the relay: who is paired with whom.
//!
//! 1. **Creation** — a host gets a six-digit code and a stable session id
//! 2. **Joining** — a client trades the code for a seat in the session
//! 3. **Suspension and recovery** — a role slot that loses its connection
//!    goes offline and can be reclaimed until the grace period ends
//!
//! The store is synchronous and knows nothing about sockets or timers.
//! Liveness of a connection is asked of the caller (the hub's connection
//! registry) through an `is_live` predicate, so a stale connection id in a
//! slot always reads as "absent".
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)  ← routes messages, owns timers and the connection registry
//!     ↕
//! Session Layer (this crate)  ← pairs, slots, control flag
//!     ↕
//! Protocol Layer (below)  ← SessionCode, SessionId, Role, ErrorCode
//! ```

mod error;
mod session;
mod store;

pub use error::SessionError;
pub use session::{Session, SessionConfig, Slot, SlotState};
pub use store::{Departure, Expiry, Joined, OfflineChange, Restored, SessionStore};
