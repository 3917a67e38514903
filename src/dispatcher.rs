use std::sync::Arc;

use tracing::debug;

use crate::registry::{ClientChannel, SessionRegistry};
use crate::rooms::RoomRouter;
use crate::signaling::{ClientEvent, DirectedSignal, ServerEvent, SignalKind};

/// Decodes inbound frames and drives the registry and room router.
///
/// The transport layer calls in with three events per connection lifetime:
/// connected, zero or more text frames, disconnected. Everything here is
/// best-effort; no inbound frame can fail the connection.
#[derive(Clone)]
pub struct Dispatcher {
    sessions: Arc<SessionRegistry>,
    rooms: Arc<RoomRouter>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let rooms = Arc::new(RoomRouter::new(sessions.clone()));
        Self { sessions, rooms }
    }

    /// Transport accepted a connection: record the channel and tell the
    /// client its own address for peers to target later.
    pub async fn client_connected(&self, client_id: &str, channel: ClientChannel) {
        self.sessions.register(client_id, channel.clone());
        let hello = ServerEvent::ClientId {
            client_id: client_id.to_string(),
        }
        .to_frame();
        if channel.send(hello).is_err() {
            debug!("client {client_id} went away before receiving its id");
        }
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed JSON, a missing `type`, and unrecognized types are all
    /// ignored: one bad frame never tears down the connection or leaks to
    /// other clients.
    pub async fn message_received(&self, client_id: &str, channel: &ClientChannel, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(err) => {
                debug!("ignoring malformed frame from {client_id}: {err}");
                return;
            }
        };

        match event {
            ClientEvent::Join { room_id } => self.rooms.join(client_id, channel, &room_id).await,
            ClientEvent::Offer(signal) => self.relay(client_id, SignalKind::Offer, signal).await,
            ClientEvent::Answer(signal) => self.relay(client_id, SignalKind::Answer, signal).await,
            ClientEvent::Candidate(signal) => {
                self.relay(client_id, SignalKind::Candidate, signal).await
            }
            ClientEvent::Leave { room_id } => self.rooms.leave(client_id, &room_id).await,
            ClientEvent::Unknown => debug!("ignoring frame with unknown type from {client_id}"),
        }
    }

    /// Transport lost the connection: forget the channel, then sweep the
    /// client out of every room. Idempotent, and safe while the channel is
    /// mid-teardown.
    pub async fn client_disconnected(&self, client_id: &str) {
        self.sessions.unregister(client_id);
        self.rooms.leave_all(client_id).await;
    }

    async fn relay(&self, client_id: &str, kind: SignalKind, signal: DirectedSignal) {
        if signal.to.is_empty() {
            debug!("dropping {} from {client_id}: no target", kind.as_str());
            return;
        }
        if let Err(reason) = self.rooms.relay(client_id, kind, &signal).await {
            debug!("dropping {} from {client_id}: {reason}", kind.as_str());
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
