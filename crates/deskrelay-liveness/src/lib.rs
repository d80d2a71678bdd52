//! Liveness monitoring for deskrelay.
//!
//! A connection can die without ever closing: a laptop lid shuts, a NAT
//! mapping expires, a proxy drops the socket silently. The relay finds
//! these by probing. Every `probe_interval` each open connection is
//! checked:
//!
//! - if it never answered the previous probe, it is terminated through the
//!   ordinary disconnect path (so its session slot goes offline exactly as
//!   if it had closed)
//! - otherwise its answered flag is cleared and a new ping goes out
//!
//! # Disabled mode
//!
//! When `probe_interval_secs` is 0, [`Heartbeat::wait_for_probe`] pends
//! forever and nothing is ever terminated for silence.
//!
//! # Integration
//!
//! Both halves sit inside the hub actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* Pong → tracker.record_pong(id) */ }
//!         _ = heartbeat.wait_for_probe() => {
//!             let sweep = tracker.sweep();
//!             for id in sweep.terminate { /* close path */ }
//!             for id in sweep.probe { /* send ping */ }
//!         }
//!     }
//! }
//! ```

mod heartbeat;
mod tracker;

pub use heartbeat::{Heartbeat, LivenessConfig, Probe};
pub use tracker::{LivenessTracker, Sweep};
