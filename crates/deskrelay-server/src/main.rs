//! deskrelay server binary.
//!
//! Reads its settings from the environment (`HOST`, `PORT`,
//! `RECONNECT_GRACE_SECS`, `PROBE_INTERVAL_SECS`) and runs until Ctrl-C.

use deskrelay::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset: every deskrelay crate at `info`.
const DEFAULT_FILTER: &str = "deskrelay=info,deskrelay_transport=info,deskrelay_protocol=info,\
                              deskrelay_session=info,deskrelay_liveness=info,deskrelay_hub=info";

#[tokio::main]
async fn main() -> Result<(), DeskRelayError> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        addr = %config.bind_addr(),
        reconnect_grace_secs = config.reconnect_grace_secs,
        probe_interval_secs = config.probe_interval_secs,
        "starting deskrelay"
    );

    let server = DeskRelayServerBuilder::from_config(&config).build().await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
