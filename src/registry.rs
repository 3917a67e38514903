use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Write half of a single client connection.
///
/// Frames pushed here are drained by that connection's writer task, which
/// serializes all writes to the underlying socket. The core only ever sends
/// through this handle; closing and recreating the connection belongs to the
/// transport layer.
#[derive(Debug, Clone)]
pub struct ClientChannel {
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("client channel closed")]
pub struct ChannelClosed;

impl ClientChannel {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Queue a text frame for the connection's writer task.
    pub fn send(&self, frame: String) -> Result<(), ChannelClosed> {
        self.tx.send(frame).map_err(|_| ChannelClosed)
    }

    /// Whether the writer task is still draining this channel.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Live connections, keyed by client id.
///
/// Entries exist exactly for the lifetime of their connection: added when the
/// transport accepts a socket, removed when it disconnects. Entries are
/// independent per key, so a concurrent map suffices here; room membership
/// has its own lock domain in [`crate::rooms`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, ClientChannel>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly connected client. Ids are generated per connection so
    /// a collision means an id-reuse bug upstream; the new entry wins.
    pub fn register(&self, client_id: &str, channel: ClientChannel) {
        if self
            .sessions
            .insert(client_id.to_string(), channel)
            .is_some()
        {
            warn!("client id {client_id} re-registered while still connected");
        }
    }

    /// Resolve a client id to its channel, used by relay to resolve `to`.
    pub fn lookup(&self, client_id: &str) -> Option<ClientChannel> {
        self.sessions.get(client_id).map(|entry| entry.value().clone())
    }

    /// Drop a disconnected client. Unknown ids are a no-op.
    pub fn unregister(&self, client_id: &str) {
        self.sessions.remove(client_id);
    }
}
