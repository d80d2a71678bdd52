//! Server configuration.
//!
//! Configuration is loaded from environment variables. Every setting has a
//! default; a variable that is present but does not parse is an error
//! rather than silently falling back.

use std::collections::HashMap;
use std::env::{self, VarError};
use std::str::FromStr;

use deskrelay_liveness::LivenessConfig;
use deskrelay_session::SessionConfig;
use thiserror::Error;

/// Default listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default reconnection grace period in seconds.
pub const DEFAULT_RECONNECT_GRACE_SECS: u64 = 120;

/// Default seconds between liveness probes.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Relay server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen host (`HOST`, default `0.0.0.0`).
    pub host: String,

    /// Listen port (`PORT`, default 3000).
    pub port: u16,

    /// Seconds a dropped host or client may take to reconnect
    /// (`RECONNECT_GRACE_SECS`, default 120, 0 = no grace).
    pub reconnect_grace_secs: u64,

    /// Seconds between liveness probes (`PROBE_INTERVAL_SECS`, default 30,
    /// 0 = never probe).
    pub probe_interval_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reconnect_grace_secs: DEFAULT_RECONNECT_GRACE_SECS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&collect_vars(|key| env::var(key))?)
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = vars
            .get("HOST")
            .filter(|h| !h.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        Ok(Self {
            host,
            port: parse_var(vars, "PORT", DEFAULT_PORT)?,
            reconnect_grace_secs: parse_var(
                vars,
                "RECONNECT_GRACE_SECS",
                DEFAULT_RECONNECT_GRACE_SECS,
            )?,
            probe_interval_secs: parse_var(
                vars,
                "PROBE_INTERVAL_SECS",
                DEFAULT_PROBE_INTERVAL_SECS,
            )?,
        })
    }

    /// `host:port`, ready for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            reconnect_grace_secs: self.reconnect_grace_secs,
        }
    }

    pub fn liveness_config(&self) -> LivenessConfig {
        LivenessConfig::with_interval(self.probe_interval_secs)
    }
}

/// Every variable the server reads.
const ENV_KEYS: [&str; 4] = ["HOST", "PORT", "RECONNECT_GRACE_SECS", "PROBE_INTERVAL_SECS"];

/// Reads only the known keys, so unrelated non-UTF-8 variables are ignored.
fn collect_vars(
    lookup: impl Fn(&str) -> Result<String, VarError>,
) -> Result<HashMap<String, String>, ConfigError> {
    let mut vars = HashMap::new();
    for key in ENV_KEYS {
        match lookup(key) {
            Ok(value) => {
                vars.insert(key.to_string(), value);
            }
            Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(raw)) => {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    raw.to_string_lossy().into_owned(),
                ));
            }
        }
    }
    Ok(vars)
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw.clone())),
    }
}
