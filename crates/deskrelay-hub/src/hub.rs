//! Hub actor: the single task that owns all relay state.
//!
//! Connection handlers talk to it through a [`HubHandle`]; the hub talks
//! back through each connection's [`Outbound`] channel. Session store,
//! connection registry, grace timers and liveness flags are all fields of
//! one actor, so every mutation happens one command at a time and no
//! locks are needed.

use deskrelay_liveness::{Heartbeat, LivenessTracker};
use deskrelay_protocol::{ClientMessage, ConnectionId, Role, ServerMessage, SessionId};
use deskrelay_session::{Expiry, Session, SessionConfig, SessionStore};
use tokio::sync::{mpsc, oneshot};

use crate::registry::{ConnectionRegistry, Outbound, OutboundSender};
use crate::supervisor::{GraceTimers, TimerKey};
use crate::{HubConfig, HubError};

/// Commands sent to the hub actor through its channel.
///
/// The `oneshot::Sender` in some variants is a "reply channel" — the
/// caller sends a command and waits for the response on that channel.
pub(crate) enum HubCommand {
    /// A transport connection opened.
    Connect {
        conn: ConnectionId,
        sender: OutboundSender,
    },

    /// A decoded message from a connection.
    Message {
        conn: ConnectionId,
        msg: ClientMessage,
    },

    /// A connection answered a liveness probe.
    Pong { conn: ConnectionId },

    /// A transport connection closed.
    Disconnect { conn: ConnectionId },

    /// Request counters.
    Stats { reply: oneshot::Sender<HubStats> },

    /// Stop the hub.
    Shutdown,
}

/// A snapshot of hub counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Registered connections.
    pub connections: usize,
    /// Live sessions.
    pub sessions: usize,
    /// Grace periods currently running.
    pub pending_timers: usize,
}

/// Handle to the running hub actor.
///
/// Cheap to clone — it's just an `mpsc::Sender` wrapper. Every
/// connection handler holds one.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Registers a new connection. The hub greets it with `connected`.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        sender: OutboundSender,
    ) -> Result<(), HubError> {
        self.send(HubCommand::Connect { conn, sender }).await
    }

    /// Delivers a decoded message (fire-and-forget).
    pub async fn message(&self, conn: ConnectionId, msg: ClientMessage) -> Result<(), HubError> {
        self.send(HubCommand::Message { conn, msg }).await
    }

    /// Reports a pong.
    pub async fn pong(&self, conn: ConnectionId) -> Result<(), HubError> {
        self.send(HubCommand::Pong { conn }).await
    }

    /// Reports that a connection closed. Repeated calls are no-ops.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), HubError> {
        self.send(HubCommand::Disconnect { conn }).await
    }

    /// Requests current counters.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Tells the hub to shut down. Every outbound channel is dropped,
    /// which ends the connection handlers.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.send(HubCommand::Shutdown).await
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), HubError> {
        self.sender.send(cmd).await.map_err(|_| HubError::Unavailable)
    }
}

/// The internal hub state. Runs inside a Tokio task.
pub(crate) struct HubActor {
    pub(crate) store: SessionStore,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) timers: GraceTimers,
    liveness: LivenessTracker,
    heartbeat: Heartbeat,
    session_config: SessionConfig,
    receiver: mpsc::Receiver<HubCommand>,
}

impl HubActor {
    pub(crate) fn new(config: HubConfig) -> (Self, mpsc::Sender<HubCommand>) {
        let (tx, rx) = mpsc::channel(config.channel_size.max(1));
        let actor = HubActor {
            store: SessionStore::new(),
            registry: ConnectionRegistry::default(),
            timers: GraceTimers::new(config.session.grace()),
            liveness: LivenessTracker::new(),
            heartbeat: Heartbeat::new(config.liveness),
            session_config: config.session,
            receiver: rx,
        };
        (actor, tx)
    }

    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(
            grace_secs = self.session_config.reconnect_grace_secs,
            probe_interval = ?self.heartbeat.interval(),
            "hub started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(HubCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                key = self.timers.next_expired() => {
                    self.handle_grace_expired(key);
                }
                probe = self.heartbeat.wait_for_probe() => {
                    tracing::trace!(round = probe.round, "liveness sweep");
                    self.handle_probe_round();
                }
            }
        }

        tracing::info!(
            connections = self.registry.len(),
            sessions = self.store.len(),
            "hub stopped"
        );
    }

    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Connect { conn, sender } => self.handle_connect(conn, sender),
            HubCommand::Message { conn, msg } => self.handle_message(conn, msg),
            HubCommand::Pong { conn } => self.liveness.record_pong(conn),
            HubCommand::Disconnect { conn } => self.handle_close(conn),
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            HubCommand::Shutdown => {}
        }
    }

    fn handle_connect(&mut self, conn: ConnectionId, sender: OutboundSender) {
        self.registry.insert(conn, sender);
        self.liveness.track(conn);
        self.registry
            .send(conn, ServerMessage::Connected { client_id: conn });
        tracing::debug!(%conn, connections = self.registry.len(), "connection registered");
    }

    /// The shared close path: transport close, read error, and liveness
    /// termination all end here.
    pub(crate) fn handle_close(&mut self, conn: ConnectionId) {
        self.liveness.forget(conn);
        let Some(entry) = self.registry.remove(conn) else {
            return;
        };
        tracing::debug!(%conn, "connection closed");

        if let Some(binding) = entry.binding {
            self.vacate(binding.session_id, binding.role, conn);
        }
    }

    /// The bound connection of a slot went away.
    fn vacate(&mut self, session_id: SessionId, role: Role, conn: ConnectionId) {
        let Some(change) = self.store.mark_offline(&session_id, role, conn) else {
            return;
        };

        if !self.session_config.grace_enabled() {
            if let (true, Some(host)) = (change.control_revoked, change.peer) {
                self.registry
                    .send(host, ServerMessage::ControlStatus { enabled: false });
            }
            self.finalize(&session_id, role, conn);
            return;
        }

        if let Some(peer) = change.peer {
            let notice = match role {
                Role::Host => ServerMessage::HostOffline,
                Role::Client => ServerMessage::ClientOffline,
            };
            self.registry.send(peer, notice);
            if change.control_revoked {
                self.registry
                    .send(peer, ServerMessage::ControlStatus { enabled: false });
            }
        }

        self.timers.arm(TimerKey {
            session_id,
            role,
            conn,
        });
    }

    fn handle_grace_expired(&mut self, key: TimerKey) {
        self.finalize(&key.session_id, key.role, key.conn);
    }

    /// Offline → Gone. A slot reclaimed in the meantime is left alone.
    fn finalize(&mut self, session_id: &SessionId, role: Role, stale: ConnectionId) {
        match self.store.expire(session_id, role, stale) {
            None => {
                tracing::debug!(%session_id, %role, %stale, "slot already reclaimed");
            }
            Some(Expiry::SessionRemoved { session }) => self.end_session(&session),
            Some(Expiry::ClientCleared { host }) => {
                if let Some(host) = host {
                    self.registry.send(host, ServerMessage::ClientDisconnected);
                }
            }
        }
    }

    /// Cleans up after a session that left the store without its host
    /// leaving: timers go, and a live client is unbound and told.
    pub(crate) fn end_session(&mut self, session: &Session) {
        self.timers.cancel_session(&session.id);
        if let Some(client) = session.client.active() {
            self.registry.unbind(client);
            self.registry.send(client, ServerMessage::HostDisconnected);
        }
    }

    fn handle_probe_round(&mut self) {
        let sweep = self.liveness.sweep();
        for conn in sweep.terminate {
            self.registry.push(conn, Outbound::Close);
            self.handle_close(conn);
        }
        for conn in sweep.probe {
            self.registry.push(conn, Outbound::Ping);
        }
    }

    fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.len(),
            sessions: self.store.len(),
            pending_timers: self.timers.len(),
        }
    }
}

/// Spawns the hub actor task and returns a handle to communicate with it.
///
/// `config.channel_size` controls backpressure — if the channel fills
/// up, handlers will wait (bounded channel).
pub fn spawn_hub(config: HubConfig) -> HubHandle {
    let (actor, tx) = HubActor::new(config);
    tokio::spawn(actor.run());
    HubHandle { sender: tx }
}
