//! Per-connection handler: framing in, framing out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the hub (which greets the peer with `connected`)
//!   2. Loop: decode inbound frames and forward them to the hub, and
//!      write whatever the hub queues on this connection's channel
//!   3. On close, error, or termination, report the disconnect

use deskrelay_hub::{HubHandle, Outbound};
use deskrelay_protocol::{ErrorCode, JsonCodec, ServerMessage};
use deskrelay_transport::{Connection, ConnectionId, Incoming, WebSocketConnection};
use tokio::sync::mpsc;

use crate::DeskRelayError;

/// Drop guard that reports the disconnect when the handler exits.
///
/// This ensures the session slot goes offline even if the handler
/// returns early with an error or panics. Since `Drop` is synchronous,
/// we spawn a fire-and-forget task for the async send.
struct ConnectionGuard {
    conn_id: ConnectionId,
    hub: HubHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            let _ = hub.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    hub: HubHandle,
) -> Result<(), DeskRelayError> {
    let conn_id = conn.id();
    let codec = JsonCodec;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    hub.connect(conn_id, outbound_tx).await?;
    let _guard = ConnectionGuard {
        conn_id,
        hub: hub.clone(),
    };
    tracing::info!(%conn_id, "peer connected");

    loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(Incoming::Message(data))) => match codec.decode(&data) {
                    Ok(msg) => hub.message(conn_id, msg).await?,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "rejecting frame");
                        send_error(&conn, &codec, e.code()).await?;
                    }
                },
                Ok(Some(Incoming::Pong)) => hub.pong(conn_id).await?,
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Message(msg)) => {
                    let text = codec.encode(&msg)?;
                    conn.send(&text).await?;
                }
                Some(Outbound::Ping) => conn.ping().await?,
                Some(Outbound::Close) => {
                    tracing::warn!(%conn_id, "terminating unresponsive connection");
                    let _ = conn.close().await;
                    break;
                }
                None => {
                    tracing::debug!(%conn_id, "hub stopped, closing");
                    let _ = conn.close().await;
                    break;
                }
            },
        }
    }

    // _guard drops here → disconnect fires.
    Ok(())
}

/// Sends an `error` message straight to the peer.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    code: ErrorCode,
) -> Result<(), DeskRelayError> {
    let text = codec.encode(&ServerMessage::error(code))?;
    conn.send(&text).await?;
    Ok(())
}
