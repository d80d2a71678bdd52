//! The probe timer.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the liveness monitor.
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// Seconds between probe rounds. 0 = disabled (never probe).
    pub probe_interval_secs: u64,
    /// Random jitter (0–max ms) added to the *first* round so a fleet of
    /// relays restarted together does not probe in lockstep.
    pub initial_jitter_ms: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 30,
            initial_jitter_ms: 1_000,
        }
    }
}

impl LivenessConfig {
    /// Longest supported interval: one day.
    pub const MAX_PROBE_INTERVAL_SECS: u64 = 86_400;

    /// A config probing every `secs` seconds with default jitter.
    pub fn with_interval(secs: u64) -> Self {
        Self {
            probe_interval_secs: secs,
            ..Default::default()
        }
    }

    /// A config that never probes.
    pub fn disabled() -> Self {
        Self::with_interval(0)
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Heartbeat::new`]. Rules:
    /// - `probe_interval_secs` capped to [`Self::MAX_PROBE_INTERVAL_SECS`]
    /// - `initial_jitter_ms` capped to one interval
    pub fn validated(mut self) -> Self {
        if self.probe_interval_secs > Self::MAX_PROBE_INTERVAL_SECS {
            warn!(
                interval = self.probe_interval_secs,
                max = Self::MAX_PROBE_INTERVAL_SECS,
                "probe_interval_secs exceeds maximum, clamping"
            );
            self.probe_interval_secs = Self::MAX_PROBE_INTERVAL_SECS;
        }
        self.initial_jitter_ms = self
            .initial_jitter_ms
            .min(self.probe_interval_secs.saturating_mul(1_000));
        self
    }

    /// The interval between rounds, or `None` when disabled.
    pub fn probe_interval(&self) -> Option<Duration> {
        if self.probe_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.probe_interval_secs))
        }
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// One probe round, returned by [`Heartbeat::wait_for_probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Monotonically increasing round number (starts at 1).
    pub round: u64,
}

/// Fires once per probe interval.
///
/// A round that fires late (the actor was busy) is not replayed: the next
/// deadline is always computed from the moment the round actually fired.
pub struct Heartbeat {
    interval: Option<Duration>,
    next: Option<Instant>,
    rounds: u64,
}

impl Heartbeat {
    /// Create a heartbeat from config.
    ///
    /// The first round is scheduled one interval from now plus a random
    /// jitter.
    pub fn new(config: LivenessConfig) -> Self {
        let config = config.validated();
        let interval = config.probe_interval();

        let next = interval.map(|d| {
            let jitter = if config.initial_jitter_ms > 0 {
                let ms = rand::rng().random_range(0..config.initial_jitter_ms);
                Duration::from_millis(ms)
            } else {
                Duration::ZERO
            };
            Instant::now() + d + jitter
        });

        match interval {
            Some(d) => debug!(interval_secs = d.as_secs(), "heartbeat created"),
            None => debug!("heartbeat disabled"),
        }

        Self {
            interval,
            next,
            rounds: 0,
        }
    }

    /// Wait until the next probe round is due.
    ///
    /// When disabled this future pends forever; `tokio::select!` keeps
    /// serving its other branches.
    pub async fn wait_for_probe(&mut self) -> Probe {
        let (next, interval) = match (self.next, self.interval) {
            (Some(next), Some(interval)) => (next, interval),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        self.rounds += 1;
        self.next = Some(Instant::now() + interval);
        trace!(round = self.rounds, "probe round due");

        Probe { round: self.rounds }
    }

    /// Whether probing is switched off.
    pub fn is_disabled(&self) -> bool {
        self.interval.is_none()
    }

    /// Rounds fired so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// The interval between rounds, or `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}
