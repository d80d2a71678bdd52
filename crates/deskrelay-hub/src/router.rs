//! Message router: one handler per inbound message type.
//!
//! Every handler checks its preconditions before touching anything, so a
//! rejected request changes no state and costs the sender exactly one
//! `error` reply.

use deskrelay_protocol::{
    ClientMessage, ConnectionId, Role, ServerMessage, SessionCode, SessionId,
};
use deskrelay_session::SessionError;
use serde_json::Value;

use crate::HubError;
use crate::hub::HubActor;

/// Which signaling payload is being relayed.
#[derive(Debug, Clone, Copy)]
enum Signal {
    Offer,
    Answer,
    IceCandidate,
}

impl HubActor {
    pub(crate) fn handle_message(&mut self, conn: ConnectionId, msg: ClientMessage) {
        if !self.registry.contains(conn) {
            tracing::debug!(%conn, "message from unregistered connection, ignoring");
            return;
        }

        let result = match msg {
            ClientMessage::CreateSession => self.create_session(conn),
            ClientMessage::JoinSession { session_code } => {
                self.join_session(conn, session_code)
            }
            ClientMessage::ReconnectSession { session_code, role } => {
                self.reconnect_session(conn, session_code, role)
            }
            ClientMessage::LeaveSession { session_id } => {
                self.leave_session(conn, session_id)
            }
            ClientMessage::Offer { session_id, offer } => {
                self.relay_signal(conn, session_id, Signal::Offer, offer)
            }
            ClientMessage::Answer { session_id, answer } => {
                self.relay_signal(conn, session_id, Signal::Answer, answer)
            }
            ClientMessage::IceCandidate {
                session_id,
                candidate,
            } => self.relay_signal(conn, session_id, Signal::IceCandidate, candidate),
            ClientMessage::ToggleControl {
                session_id,
                enabled,
            } => self.toggle_control(conn, session_id, enabled),
            ClientMessage::ControlEvent { session_id, event } => {
                self.control_event(conn, session_id, event)
            }
        };

        if let Err(err) = result {
            tracing::debug!(%conn, error = %err, "request rejected");
            if let Some(code) = err.code() {
                self.registry.send(conn, ServerMessage::error(code));
            }
        }
    }

    fn ensure_unbound(&mut self, conn: ConnectionId) -> Result<(), HubError> {
        self.drop_dangling_binding(conn);
        match self.registry.binding(conn) {
            Some(_) => Err(HubError::AlreadyInSession(conn)),
            None => Ok(()),
        }
    }

    /// A binding whose session is gone counts as no binding.
    fn drop_dangling_binding(&mut self, conn: ConnectionId) {
        let dangling = self
            .registry
            .binding(conn)
            .is_some_and(|b| self.store.get(&b.session_id).is_none());
        if dangling {
            tracing::debug!(%conn, "dropping binding to a removed session");
            self.registry.unbind(conn);
        }
    }

    fn create_session(&mut self, conn: ConnectionId) -> Result<(), HubError> {
        self.ensure_unbound(conn)?;

        let session = self.store.create(conn)?;
        let (session_id, session_code) = (session.id.clone(), session.code.clone());

        self.registry.bind(conn, session_id.clone(), Role::Host);
        self.registry.send(
            conn,
            ServerMessage::SessionCreated {
                session_code,
                session_id,
            },
        );
        Ok(())
    }

    fn join_session(&mut self, conn: ConnectionId, code: SessionCode) -> Result<(), HubError> {
        self.ensure_unbound(conn)?;

        let registry = &self.registry;
        if let Some(orphan) = self.store.reap_orphan(&code, |c| registry.is_live(c)) {
            self.end_session(&orphan);
            return Err(SessionError::HostUnavailable(orphan.id).into());
        }

        let registry = &self.registry;
        let joined = self.store.join(&code, conn, |c| registry.is_live(c))?;
        let (session_id, host, displaced) =
            (joined.session.id.clone(), joined.host, joined.displaced);

        self.timers.cancel_slot(&session_id, Role::Client);
        if let Some(stale) = displaced {
            self.registry.unbind(stale);
        }
        self.registry.bind(conn, session_id.clone(), Role::Client);

        self.registry.send(
            conn,
            ServerMessage::SessionJoined {
                session_id,
                host_id: host,
            },
        );
        self.registry
            .send(host, ServerMessage::ClientJoined { client_id: conn });
        Ok(())
    }

    fn reconnect_session(
        &mut self,
        conn: ConnectionId,
        code: SessionCode,
        role: Role,
    ) -> Result<(), HubError> {
        self.ensure_unbound(conn)?;

        let registry = &self.registry;
        let restored = self.store.restore(&code, role, conn, |c| registry.is_live(c))?;
        let session = restored.session;
        let peer = session
            .peer_of(role)
            .filter(|&peer| registry.is_live(peer));
        let reply = ServerMessage::SessionRestored {
            session_id: session.id.clone(),
            session_code: session.code.clone(),
            role,
            control_enabled: session.control_enabled,
            peer_connected: peer.is_some(),
        };
        let (session_id, displaced) = (session.id.clone(), restored.displaced);

        self.timers.cancel_slot(&session_id, role);
        self.registry.unbind(displaced);
        self.registry.bind(conn, session_id, role);

        self.registry.send(conn, reply);
        if let Some(peer) = peer {
            let notice = match role {
                Role::Host => ServerMessage::HostReconnected { host_id: conn },
                Role::Client => ServerMessage::ClientReconnected { client_id: conn },
            };
            self.registry.send(peer, notice);
        }
        Ok(())
    }

    fn leave_session(&mut self, conn: ConnectionId, session_id: SessionId) -> Result<(), HubError> {
        self.drop_dangling_binding(conn);
        let departure = self.store.leave(&session_id, conn)?;
        self.registry.unbind(conn);

        if departure.session_removed {
            self.timers.cancel_session(&session_id);
            if let Some(client) = departure.peer {
                self.registry.unbind(client);
                self.registry.send(client, ServerMessage::HostDisconnected);
            }
        } else if let Some(host) = departure.peer {
            if departure.control_revoked {
                self.registry
                    .send(host, ServerMessage::ControlStatus { enabled: false });
            }
            self.registry.send(host, ServerMessage::ClientDisconnected);
        }

        self.registry
            .send(conn, ServerMessage::SessionLeft { session_id });
        Ok(())
    }

    /// The live connection on the other side of `conn` in this session.
    fn live_peer(&self, conn: ConnectionId, session_id: &SessionId) -> Result<ConnectionId, HubError> {
        let (session, role) = self.store.member(session_id, conn)?;
        session
            .peer_of(role)
            .filter(|&peer| self.registry.is_live(peer))
            .ok_or_else(|| HubError::PeerNotConnected(session_id.clone()))
    }

    fn relay_signal(
        &mut self,
        conn: ConnectionId,
        session_id: SessionId,
        signal: Signal,
        payload: Value,
    ) -> Result<(), HubError> {
        let peer = self.live_peer(conn, &session_id)?;
        tracing::debug!(%conn, %peer, ?signal, "relaying signal");

        let msg = match signal {
            Signal::Offer => ServerMessage::Offer {
                session_id,
                offer: payload,
                from: conn,
            },
            Signal::Answer => ServerMessage::Answer {
                session_id,
                answer: payload,
                from: conn,
            },
            Signal::IceCandidate => ServerMessage::IceCandidate {
                session_id,
                candidate: payload,
                from: conn,
            },
        };
        self.registry.send(peer, msg);
        Ok(())
    }

    fn toggle_control(
        &mut self,
        conn: ConnectionId,
        session_id: SessionId,
        enabled: bool,
    ) -> Result<(), HubError> {
        let session = self.store.set_control(&session_id, conn, enabled)?;
        for member in session.members() {
            self.registry
                .send(member, ServerMessage::ControlStatus { enabled });
        }
        Ok(())
    }

    fn control_event(
        &mut self,
        conn: ConnectionId,
        session_id: SessionId,
        event: Value,
    ) -> Result<(), HubError> {
        let (session, _) = self.store.member(&session_id, conn)?;
        if !session.control_enabled {
            return Err(HubError::ControlNotEnabled(session_id));
        }
        let peer = self.live_peer(conn, &session_id)?;

        self.registry
            .send(peer, ServerMessage::ControlEvent { event, from: conn });
        Ok(())
    }
}
