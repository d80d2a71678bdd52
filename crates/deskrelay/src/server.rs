//! `DeskRelayServer` builder and server loop.
//!
//! This is the entry point for running a relay. It ties together all the
//! layers: transport → protocol → hub (session store, registry, timers,
//! liveness).

use deskrelay_hub::{HubConfig, HubHandle, spawn_hub};
use deskrelay_liveness::LivenessConfig;
use deskrelay_session::SessionConfig;
use deskrelay_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{DeskRelayError, ServerConfig};

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use deskrelay::prelude::*;
///
/// # async fn start() -> Result<(), DeskRelayError> {
/// let server = DeskRelayServer::builder()
///     .bind("0.0.0.0:3000")
///     .session_config(SessionConfig { reconnect_grace_secs: 60 })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DeskRelayServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    liveness_config: LivenessConfig,
}

impl DeskRelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            session_config: SessionConfig::default(),
            liveness_config: LivenessConfig::default(),
        }
    }

    /// Creates a builder from environment-derived settings.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new()
            .bind(&config.bind_addr())
            .session_config(config.session_config())
            .liveness_config(config.liveness_config())
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration (grace period).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the liveness configuration (probe interval).
    pub fn liveness_config(mut self, config: LivenessConfig) -> Self {
        self.liveness_config = config;
        self
    }

    /// Binds the listener and starts the hub.
    pub async fn build(self) -> Result<DeskRelayServer, DeskRelayError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let hub = spawn_hub(HubConfig {
            session: self.session_config,
            liveness: self.liveness_config,
            ..HubConfig::default()
        });

        Ok(DeskRelayServer { transport, hub })
    }
}

impl Default for DeskRelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A relay server with a bound listener and a running hub.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DeskRelayServer {
    transport: WebSocketTransport,
    hub: HubHandle,
}

impl DeskRelayServer {
    /// Creates a new builder.
    pub fn builder() -> DeskRelayServerBuilder {
        DeskRelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the hub, e.g. for [`HubHandle::stats`].
    pub fn hub(&self) -> HubHandle {
        self.hub.clone()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated; a failed accept is logged
    /// and the loop carries on.
    pub async fn run(mut self) -> Result<(), DeskRelayError> {
        tracing::info!(addr = ?self.local_addr().ok(), "deskrelay server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let hub = self.hub.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, hub).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
