//! Integration tests for the hub actor.
//!
//! Each test participant is an outbound channel standing in for a
//! connection handler. "The socket closed" is `hub.disconnect(id)` plus
//! dropping the receiver; "the socket died silently" is dropping the
//! receiver alone. Timer-driven tests run on tokio's paused clock.

use std::time::Duration;

use deskrelay_hub::{HubConfig, HubHandle, HubStats, Outbound, spawn_hub};
use deskrelay_liveness::LivenessConfig;
use deskrelay_protocol::{
    ClientMessage, ConnectionId, ErrorCode, Role, ServerMessage, SessionCode, SessionId,
};
use deskrelay_session::SessionConfig;
use serde_json::json;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const GRACE_SECS: u64 = 120;

fn config(grace_secs: u64) -> HubConfig {
    HubConfig {
        session: SessionConfig {
            reconnect_grace_secs: grace_secs,
        },
        liveness: LivenessConfig::disabled(),
        channel_size: 64,
    }
}

fn hub() -> HubHandle {
    spawn_hub(config(GRACE_SECS))
}

struct Peer {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Peer {
    async fn next_within(&mut self, limit: Duration) -> Outbound {
        tokio::time::timeout(limit, self.rx.recv())
            .await
            .expect("timed out waiting for outbound")
            .expect("outbound channel closed")
    }

    async fn next_msg(&mut self) -> ServerMessage {
        match self.next_within(Duration::from_secs(1)).await {
            Outbound::Message(msg) => msg,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    async fn expect(&mut self, expected: ServerMessage) {
        assert_eq!(self.next_msg().await, expected);
    }

    async fn expect_error(&mut self, code: ErrorCode) {
        self.expect(ServerMessage::error(code)).await;
    }

    async fn send(&self, hub: &HubHandle, msg: ClientMessage) {
        hub.message(self.id, msg).await.unwrap();
    }

    /// Nothing queued. Call after a `stats()` barrier.
    fn assert_silent(&mut self) {
        if let Ok(extra) = self.rx.try_recv() {
            panic!("{} got unexpected {extra:?}", self.id);
        }
    }
}

async fn connect(hub: &HubHandle, id: u64) -> Peer {
    let id = ConnectionId::new(id);
    let (tx, rx) = mpsc::unbounded_channel();
    hub.connect(id, tx).await.unwrap();
    let mut peer = Peer { id, rx };
    peer.expect(ServerMessage::Connected { client_id: id }).await;
    peer
}

/// The transport closed: tell the hub and drop the channel.
async fn close(hub: &HubHandle, peer: Peer) {
    hub.disconnect(peer.id).await.unwrap();
}

/// Waits until every earlier command has been processed.
async fn barrier(hub: &HubHandle) -> HubStats {
    hub.stats().await.unwrap()
}

async fn create(hub: &HubHandle, host: &mut Peer) -> (SessionId, SessionCode) {
    host.send(hub, ClientMessage::CreateSession).await;
    match host.next_msg().await {
        ServerMessage::SessionCreated {
            session_code,
            session_id,
        } => (session_id, session_code),
        other => panic!("expected session-created, got {other:?}"),
    }
}

/// Host = conn 1, client = conn 2, joined.
async fn pair(hub: &HubHandle) -> (Peer, Peer, SessionId, SessionCode) {
    let mut host = connect(hub, 1).await;
    let mut client = connect(hub, 2).await;
    let (id, code) = create(hub, &mut host).await;

    client
        .send(hub, ClientMessage::JoinSession {
            session_code: code.clone(),
        })
        .await;
    client
        .expect(ServerMessage::SessionJoined {
            session_id: id.clone(),
            host_id: host.id,
        })
        .await;
    host.expect(ServerMessage::ClientJoined {
        client_id: client.id,
    })
    .await;

    (host, client, id, code)
}

async fn enable_control(hub: &HubHandle, host: &mut Peer, client: &mut Peer, id: &SessionId) {
    host.send(hub, ClientMessage::ToggleControl {
        session_id: id.clone(),
        enabled: true,
    })
    .await;
    host.expect(ServerMessage::ControlStatus { enabled: true }).await;
    client.expect(ServerMessage::ControlStatus { enabled: true }).await;
}

// =========================================================================
// Creation and joining
// =========================================================================

#[tokio::test]
async fn test_create_session_replies_with_six_digit_code() {
    let hub = hub();
    let mut host = connect(&hub, 1).await;

    let (id, code) = create(&hub, &mut host).await;

    assert_eq!(code.as_str().len(), 6);
    let n: u32 = code.as_str().parse().unwrap();
    assert!((100_000..=999_999).contains(&n));
    assert!(!id.as_str().is_empty());
    assert_eq!(barrier(&hub).await.sessions, 1);
}

#[tokio::test]
async fn test_create_session_twice_returns_already_in_session() {
    let hub = hub();
    let mut host = connect(&hub, 1).await;
    create(&hub, &mut host).await;

    host.send(&hub, ClientMessage::CreateSession).await;

    host.expect_error(ErrorCode::AlreadyInSession).await;
    assert_eq!(barrier(&hub).await.sessions, 1);
}

#[tokio::test]
async fn test_join_unknown_code_returns_invalid_session_code() {
    let hub = hub();
    let mut client = connect(&hub, 2).await;

    client
        .send(&hub, ClientMessage::JoinSession {
            session_code: SessionCode::from("000000"),
        })
        .await;

    client.expect_error(ErrorCode::InvalidSessionCode).await;
}

#[tokio::test]
async fn test_join_pairs_host_and_client() {
    let hub = hub();
    let (mut host, mut client, _, _) = pair(&hub).await;

    barrier(&hub).await;
    host.assert_silent();
    client.assert_silent();
}

#[tokio::test]
async fn test_join_second_client_returns_session_already_has_client() {
    let hub = hub();
    let (mut host, _client, _, code) = pair(&hub).await;
    let mut third = connect(&hub, 3).await;

    third
        .send(&hub, ClientMessage::JoinSession { session_code: code })
        .await;

    third.expect_error(ErrorCode::SessionAlreadyHasClient).await;
    barrier(&hub).await;
    host.assert_silent();
}

#[tokio::test]
async fn test_join_orphaned_session_is_collected() {
    let hub = hub();
    let mut host = connect(&hub, 1).await;
    let (_, code) = create(&hub, &mut host).await;
    // The host's socket died but no close was reported yet.
    drop(host);
    let mut client = connect(&hub, 2).await;

    client
        .send(&hub, ClientMessage::JoinSession { session_code: code })
        .await;

    client.expect_error(ErrorCode::HostNotAvailable).await;
    assert_eq!(barrier(&hub).await.sessions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_join_orphaned_session_releases_seated_client() {
    let hub = hub();
    let (host, mut client, id, code) = pair(&hub).await;
    // The host's socket died but no close was reported yet.
    drop(host);
    let mut late = connect(&hub, 3).await;

    late.send(&hub, ClientMessage::JoinSession { session_code: code })
        .await;

    late.expect_error(ErrorCode::HostNotAvailable).await;
    client.expect(ServerMessage::HostDisconnected).await;
    assert_eq!(barrier(&hub).await.sessions, 0);

    client
        .send(&hub, ClientMessage::LeaveSession { session_id: id })
        .await;
    client.expect_error(ErrorCode::UnknownSession).await;

    client.send(&hub, ClientMessage::CreateSession).await;
    assert!(matches!(
        client.next_msg().await,
        ServerMessage::SessionCreated { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_join_while_host_offline_keeps_session() {
    let hub = hub();
    let mut host = connect(&hub, 1).await;
    let (_, code) = create(&hub, &mut host).await;
    close(&hub, host).await;
    let mut client = connect(&hub, 2).await;

    client
        .send(&hub, ClientMessage::JoinSession { session_code: code })
        .await;

    client.expect_error(ErrorCode::HostNotAvailable).await;
    let stats = barrier(&hub).await;
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.pending_timers, 1);
}

// =========================================================================
// Signaling relay
// =========================================================================

#[tokio::test]
async fn test_offer_answer_candidate_relayed_with_from() {
    let hub = hub();
    let (mut host, mut client, id, _) = pair(&hub).await;
    let offer = json!({"type": "offer", "sdp": "v=0"});
    let answer = json!({"type": "answer", "sdp": "v=0"});
    let candidate = json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 9 typ host"});

    host.send(&hub, ClientMessage::Offer {
        session_id: id.clone(),
        offer: offer.clone(),
    })
    .await;
    client
        .expect(ServerMessage::Offer {
            session_id: id.clone(),
            offer,
            from: host.id,
        })
        .await;

    client
        .send(&hub, ClientMessage::Answer {
            session_id: id.clone(),
            answer: answer.clone(),
        })
        .await;
    host.expect(ServerMessage::Answer {
        session_id: id.clone(),
        answer,
        from: client.id,
    })
    .await;

    client
        .send(&hub, ClientMessage::IceCandidate {
            session_id: id.clone(),
            candidate: candidate.clone(),
        })
        .await;
    host.expect(ServerMessage::IceCandidate {
        session_id: id,
        candidate,
        from: client.id,
    })
    .await;

    barrier(&hub).await;
    host.assert_silent();
    client.assert_silent();
}

#[tokio::test]
async fn test_relay_unknown_session_returns_unknown_session() {
    let hub = hub();
    let (mut host, _, _, _) = pair(&hub).await;

    host.send(&hub, ClientMessage::Offer {
        session_id: SessionId::from("no-such-session"),
        offer: json!({}),
    })
    .await;

    host.expect_error(ErrorCode::UnknownSession).await;
}

#[tokio::test]
async fn test_relay_from_non_member_returns_not_in_session() {
    let hub = hub();
    let (mut host, mut client, id, _) = pair(&hub).await;
    let mut outsider = connect(&hub, 3).await;

    outsider
        .send(&hub, ClientMessage::IceCandidate {
            session_id: id,
            candidate: json!({}),
        })
        .await;

    outsider.expect_error(ErrorCode::NotInSession).await;
    barrier(&hub).await;
    host.assert_silent();
    client.assert_silent();
}

#[tokio::test]
async fn test_relay_before_join_returns_peer_not_connected() {
    let hub = hub();
    let mut host = connect(&hub, 1).await;
    let (id, _) = create(&hub, &mut host).await;

    host.send(&hub, ClientMessage::Offer {
        session_id: id,
        offer: json!({}),
    })
    .await;

    host.expect_error(ErrorCode::PeerNotConnected).await;
}

// =========================================================================
// Control permission gate
// =========================================================================

#[tokio::test]
async fn test_toggle_control_by_client_returns_not_host() {
    let hub = hub();
    let (mut host, mut client, id, _) = pair(&hub).await;

    client
        .send(&hub, ClientMessage::ToggleControl {
            session_id: id,
            enabled: true,
        })
        .await;

    client.expect_error(ErrorCode::NotHost).await;
    barrier(&hub).await;
    host.assert_silent();
}

#[tokio::test]
async fn test_control_event_gated_until_enabled() {
    let hub = hub();
    let (mut host, mut client, id, _) = pair(&hub).await;
    let event = json!({"kind": "mousemove", "x": 10, "y": 20});

    client
        .send(&hub, ClientMessage::ControlEvent {
            session_id: id.clone(),
            event: event.clone(),
        })
        .await;
    client.expect_error(ErrorCode::ControlNotEnabled).await;

    enable_control(&hub, &mut host, &mut client, &id).await;

    client
        .send(&hub, ClientMessage::ControlEvent {
            session_id: id.clone(),
            event: event.clone(),
        })
        .await;
    host.expect(ServerMessage::ControlEvent {
        event,
        from: client.id,
    })
    .await;

    host.send(&hub, ClientMessage::ToggleControl {
        session_id: id.clone(),
        enabled: false,
    })
    .await;
    host.expect(ServerMessage::ControlStatus { enabled: false }).await;
    client.expect(ServerMessage::ControlStatus { enabled: false }).await;

    client
        .send(&hub, ClientMessage::ControlEvent {
            session_id: id,
            event: json!({}),
        })
        .await;
    client.expect_error(ErrorCode::ControlNotEnabled).await;
}

// =========================================================================
// Reconnection supervisor
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_client_offline_revokes_control_and_notifies_host() {
    let hub = hub();
    let (mut host, mut client, id, code) = pair(&hub).await;
    enable_control(&hub, &mut host, &mut client, &id).await;

    close(&hub, client).await;

    host.expect(ServerMessage::ClientOffline).await;
    host.expect(ServerMessage::ControlStatus { enabled: false }).await;

    let mut back = connect(&hub, 3).await;
    back.send(&hub, ClientMessage::ReconnectSession {
        session_code: code.clone(),
        role: Role::Client,
    })
    .await;
    back.expect(ServerMessage::SessionRestored {
        session_id: id,
        session_code: code,
        role: Role::Client,
        control_enabled: false,
        peer_connected: true,
    })
    .await;
    host.expect(ServerMessage::ClientReconnected { client_id: back.id })
        .await;
    assert_eq!(barrier(&hub).await.pending_timers, 0);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_host_reconnects_within_grace_and_control_resumes() {
    let hub = hub();
    let (mut host, mut client, id, code) = pair(&hub).await;
    enable_control(&hub, &mut host, &mut client, &id).await;

    close(&hub, host).await;
    client.expect(ServerMessage::HostOffline).await;

    tokio::time::sleep(Duration::from_secs(60)).await;

    let mut host = connect(&hub, 3).await;
    host.send(&hub, ClientMessage::ReconnectSession {
        session_code: code.clone(),
        role: Role::Host,
    })
    .await;
    host.expect(ServerMessage::SessionRestored {
        session_id: id.clone(),
        session_code: code,
        role: Role::Host,
        control_enabled: true,
        peer_connected: true,
    })
    .await;
    client
        .expect(ServerMessage::HostReconnected { host_id: host.id })
        .await;

    // No re-toggle needed.
    let event = json!({"kind": "keydown", "key": "a"});
    client
        .send(&hub, ClientMessage::ControlEvent {
            session_id: id,
            event: event.clone(),
        })
        .await;
    host.expect(ServerMessage::ControlEvent {
        event,
        from: client.id,
    })
    .await;

    // The cancelled timer never fires.
    tokio::time::sleep(Duration::from_secs(GRACE_SECS * 2)).await;
    let stats = barrier(&hub).await;
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.pending_timers, 0);
    client.assert_silent();
}

#[tokio::test(start_paused = true)]
async fn test_host_grace_expiry_ends_session() {
    let hub = hub();
    let (host, mut client, _, code) = pair(&hub).await;

    close(&hub, host).await;
    client.expect(ServerMessage::HostOffline).await;

    tokio::time::sleep(Duration::from_secs(GRACE_SECS + 1)).await;

    client.expect(ServerMessage::HostDisconnected).await;
    let stats = barrier(&hub).await;
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.pending_timers, 0);

    // Too late to come back.
    let mut late = connect(&hub, 3).await;
    late.send(&hub, ClientMessage::ReconnectSession {
        session_code: code,
        role: Role::Host,
    })
    .await;
    late.expect_error(ErrorCode::InvalidSessionCode).await;

    // The client is unbound and free to start over.
    create(&hub, &mut client).await;
}

#[tokio::test(start_paused = true)]
async fn test_client_grace_expiry_frees_slot_for_new_join() {
    let hub = hub();
    let (mut host, client, id, code) = pair(&hub).await;

    close(&hub, client).await;
    host.expect(ServerMessage::ClientOffline).await;

    tokio::time::sleep(Duration::from_secs(GRACE_SECS + 1)).await;
    host.expect(ServerMessage::ClientDisconnected).await;

    let mut late = connect(&hub, 3).await;
    late.send(&hub, ClientMessage::ReconnectSession {
        session_code: code.clone(),
        role: Role::Client,
    })
    .await;
    late.expect_error(ErrorCode::NothingToRestore).await;

    late.send(&hub, ClientMessage::JoinSession { session_code: code })
        .await;
    late.expect(ServerMessage::SessionJoined {
        session_id: id,
        host_id: host.id,
    })
    .await;
    host.expect(ServerMessage::ClientJoined { client_id: late.id })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_host_expiry_cancels_offline_client_timer() {
    let hub = hub();
    let (host, client, _, _) = pair(&hub).await;

    close(&hub, host).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    close(&hub, client).await;
    assert_eq!(barrier(&hub).await.pending_timers, 2);

    // The host's timer fires first; the client's would be due 10 s later.
    tokio::time::sleep(Duration::from_secs(GRACE_SECS - 10 + 1)).await;

    let stats = barrier(&hub).await;
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.pending_timers, 0);
}

#[tokio::test]
async fn test_reconnect_live_role_returns_role_already_occupied() {
    let hub = hub();
    let (_host, _client, _, code) = pair(&hub).await;
    let mut intruder = connect(&hub, 3).await;

    intruder
        .send(&hub, ClientMessage::ReconnectSession {
            session_code: code,
            role: Role::Host,
        })
        .await;

    intruder.expect_error(ErrorCode::RoleAlreadyOccupied).await;
}

#[tokio::test]
async fn test_reconnect_never_occupied_slot_returns_nothing_to_restore() {
    let hub = hub();
    let mut host = connect(&hub, 1).await;
    let (_, code) = create(&hub, &mut host).await;
    let mut client = connect(&hub, 2).await;

    client
        .send(&hub, ClientMessage::ReconnectSession {
            session_code: code,
            role: Role::Client,
        })
        .await;

    client.expect_error(ErrorCode::NothingToRestore).await;
}

#[tokio::test]
async fn test_disconnect_twice_is_noop() {
    let hub = hub();
    let (mut host, client, _, _) = pair(&hub).await;
    let client_id = client.id;

    close(&hub, client).await;
    hub.disconnect(client_id).await.unwrap();

    host.expect(ServerMessage::ClientOffline).await;
    let stats = barrier(&hub).await;
    assert_eq!(stats.pending_timers, 1);
    host.assert_silent();
}

#[tokio::test]
async fn test_zero_grace_finalizes_immediately() {
    let hub = spawn_hub(config(0));
    let (host, mut client, _, _) = pair(&hub).await;

    close(&hub, host).await;

    client.expect(ServerMessage::HostDisconnected).await;
    let stats = barrier(&hub).await;
    assert_eq!(stats.sessions, 0);
    assert_eq!(stats.pending_timers, 0);
}

// =========================================================================
// Explicit leave
// =========================================================================

#[tokio::test]
async fn test_leave_session_host_ends_session() {
    let hub = hub();
    let (mut host, mut client, id, _) = pair(&hub).await;

    host.send(&hub, ClientMessage::LeaveSession {
        session_id: id.clone(),
    })
    .await;

    client.expect(ServerMessage::HostDisconnected).await;
    host.expect(ServerMessage::SessionLeft { session_id: id })
        .await;
    assert_eq!(barrier(&hub).await.sessions, 0);

    // Both connections stay open and unbound.
    create(&hub, &mut host).await;
    create(&hub, &mut client).await;
}

#[tokio::test]
async fn test_leave_session_client_keeps_session() {
    let hub = hub();
    let (mut host, mut client, id, _) = pair(&hub).await;
    enable_control(&hub, &mut host, &mut client, &id).await;

    client
        .send(&hub, ClientMessage::LeaveSession {
            session_id: id.clone(),
        })
        .await;

    host.expect(ServerMessage::ControlStatus { enabled: false }).await;
    host.expect(ServerMessage::ClientDisconnected).await;
    client
        .expect(ServerMessage::SessionLeft { session_id: id })
        .await;
    let stats = barrier(&hub).await;
    assert_eq!(stats.sessions, 1);
    assert_eq!(stats.pending_timers, 0);
}

#[tokio::test]
async fn test_leave_session_non_member_returns_not_in_session() {
    let hub = hub();
    let (_host, _client, id, _) = pair(&hub).await;
    let mut outsider = connect(&hub, 3).await;

    outsider
        .send(&hub, ClientMessage::LeaveSession { session_id: id })
        .await;

    outsider.expect_error(ErrorCode::NotInSession).await;
}

// =========================================================================
// Liveness monitor
// =========================================================================

fn probing(secs: u64) -> HubConfig {
    HubConfig {
        liveness: LivenessConfig {
            probe_interval_secs: secs,
            initial_jitter_ms: 0,
        },
        ..config(GRACE_SECS)
    }
}

#[tokio::test(start_paused = true)]
async fn test_probe_pings_then_terminates_silent_connection() {
    let hub = spawn_hub(probing(30));
    let (mut host, mut client, _, _) = pair(&hub).await;

    assert_eq!(host.next_within(Duration::from_secs(31)).await, Outbound::Ping);
    assert_eq!(client.next_within(Duration::from_secs(1)).await, Outbound::Ping);

    // Only the client answers.
    hub.pong(client.id).await.unwrap();

    assert_eq!(host.next_within(Duration::from_secs(31)).await, Outbound::Close);
    client.expect(ServerMessage::HostOffline).await;
    assert_eq!(client.next_within(Duration::from_secs(1)).await, Outbound::Ping);

    let stats = barrier(&hub).await;
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.pending_timers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_probe_never_pings() {
    let hub = hub();
    let mut peer = connect(&hub, 1).await;

    tokio::time::sleep(Duration::from_secs(3_600)).await;

    barrier(&hub).await;
    peer.assert_silent();
}

// =========================================================================
// Stats and shutdown
// =========================================================================

#[tokio::test]
async fn test_stats_counts_connections_and_sessions() {
    let hub = hub();
    let (_host, _client, _, _) = pair(&hub).await;
    let _idle = connect(&hub, 3).await;

    let stats = barrier(&hub).await;

    assert_eq!(
        stats,
        HubStats {
            connections: 3,
            sessions: 1,
            pending_timers: 0,
        }
    );
}

#[tokio::test]
async fn test_shutdown_closes_outbound_channels() {
    let hub = hub();
    let mut peer = connect(&hub, 1).await;

    hub.shutdown().await.unwrap();

    assert!(peer.rx.recv().await.is_none());
    assert!(matches!(
        hub.stats().await,
        Err(deskrelay_hub::HubError::Unavailable)
    ));
}
