//! Hub configuration.

use deskrelay_liveness::LivenessConfig;
use deskrelay_session::SessionConfig;

/// Configuration for the hub actor.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Grace period for disconnected slots.
    pub session: SessionConfig,

    /// Probe interval and jitter for the liveness monitor.
    pub liveness: LivenessConfig,

    /// Capacity of the hub's command channel. When it fills up,
    /// connection handlers wait (bounded channel).
    pub channel_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            liveness: LivenessConfig::default(),
            channel_size: 1024,
        }
    }
}
