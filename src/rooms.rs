use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::registry::{ClientChannel, SessionRegistry};
use crate::signaling::{DirectedSignal, ServerEvent, SignalKind};

/// Why a directed signal was not delivered.
///
/// Internal bookkeeping only: the wire protocol never reports relay failures
/// back to the sender. A dropped offer or candidate is recovered at the
/// application layer through renegotiation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayDrop {
    #[error("room {0} does not exist")]
    UnknownRoom(String),
    #[error("{0} is not a member of room {1}")]
    NotInRoom(String, String),
    #[error("{0} is not connected")]
    TargetUnknown(String),
    #[error("channel for {0} is no longer open")]
    TargetClosed(String),
    #[error("send to {0} failed")]
    SendFailed(String),
}

/// Room membership and message routing.
///
/// All membership mutation is serialized behind one lock; this is the single
/// consistency domain for join/leave/relay ordering. Presence fan-out and
/// relays send through [`ClientChannel`] handles after membership has been
/// decided, so the room lock is never held across a socket write.
pub struct RoomRouter {
    sessions: Arc<SessionRegistry>,
    rooms: Mutex<HashMap<String, HashSet<String>>>,
}

impl RoomRouter {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self {
            sessions,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Add `client_id` to a room, creating the room on first join.
    ///
    /// Every existing member is told about the joiner and the joiner is told
    /// about every existing member, one `userJoined` pair per existing
    /// member. The joiner is never announced to itself. Joining a room twice
    /// leaves the member set unchanged but repeats the announcements, exactly
    /// like a fresh join would.
    pub async fn join(&self, client_id: &str, channel: &ClientChannel, room_id: &str) {
        let peers: Vec<String> = {
            let mut rooms = self.rooms.lock().await;
            let members = rooms.entry(room_id.to_string()).or_default();
            members.insert(client_id.to_string());
            members
                .iter()
                .filter(|member| member.as_str() != client_id)
                .cloned()
                .collect()
        };

        let joined = ServerEvent::UserJoined {
            user_id: client_id.to_string(),
        }
        .to_frame();

        for peer in peers {
            self.notify(&peer, joined.clone());
            let existing = ServerEvent::UserJoined {
                user_id: peer.clone(),
            }
            .to_frame();
            if channel.send(existing).is_err() {
                debug!("dropping userJoined({peer}) to {client_id}: channel closed");
            }
        }
    }

    /// Forward a directed signal to `signal.to` inside `signal.room_id`.
    ///
    /// Delivery requires the target to be a member of the room with a live,
    /// open channel. The sender does not have to be a member itself: a peer
    /// may signal into a room it never joined as long as the recipient is in
    /// it. The forwarded frame is the original message stamped with `from`.
    pub async fn relay(
        &self,
        from_id: &str,
        kind: SignalKind,
        signal: &DirectedSignal,
    ) -> Result<(), RelayDrop> {
        let room_id = signal.room_id.as_str();
        let to_id = signal.to.as_str();

        {
            let rooms = self.rooms.lock().await;
            let members = rooms
                .get(room_id)
                .ok_or_else(|| RelayDrop::UnknownRoom(room_id.to_string()))?;
            if !members.contains(to_id) {
                return Err(RelayDrop::NotInRoom(
                    to_id.to_string(),
                    room_id.to_string(),
                ));
            }
        }

        let channel = self
            .sessions
            .lookup(to_id)
            .ok_or_else(|| RelayDrop::TargetUnknown(to_id.to_string()))?;
        if !channel.is_open() {
            return Err(RelayDrop::TargetClosed(to_id.to_string()));
        }
        channel
            .send(signal.forwarded_frame(kind, from_id))
            .map_err(|_| RelayDrop::SendFailed(to_id.to_string()))
    }

    /// Remove `client_id` from a room and tell the remaining members.
    ///
    /// Leaving a room the client never joined, or a room that does not exist,
    /// does nothing and sends nothing. The room entry is deleted once its
    /// last member leaves.
    pub async fn leave(&self, client_id: &str, room_id: &str) {
        let remaining: Vec<String> = {
            let mut rooms = self.rooms.lock().await;
            let Some(members) = rooms.get_mut(room_id) else {
                return;
            };
            if !members.remove(client_id) {
                return;
            }
            let remaining: Vec<String> = members.iter().cloned().collect();
            if remaining.is_empty() {
                rooms.remove(room_id);
            }
            remaining
        };

        let left = ServerEvent::UserLeft {
            user_id: client_id.to_string(),
        }
        .to_frame();

        for peer in remaining {
            match self.sessions.lookup(&peer) {
                Some(chan) if chan.is_open() => {
                    if chan.send(left.clone()).is_err() {
                        debug!("dropping userLeft({client_id}) to {peer}: channel closed");
                    }
                }
                _ => debug!("dropping userLeft({client_id}) to {peer}: not reachable"),
            }
        }
    }

    /// Drop `client_id` from every room on disconnect.
    ///
    /// Sweeps all rooms the server knows about; rooms the client never joined
    /// no-op inside [`RoomRouter::leave`]. Safe to call while the client's
    /// own channel is already closed, and safe to call twice.
    pub async fn leave_all(&self, client_id: &str) {
        let room_ids: Vec<String> = {
            let rooms = self.rooms.lock().await;
            rooms.keys().cloned().collect()
        };
        for room_id in room_ids {
            self.leave(client_id, &room_id).await;
        }
    }

    fn notify(&self, target: &str, frame: String) {
        match self.sessions.lookup(target) {
            Some(chan) => {
                if chan.send(frame).is_err() {
                    debug!("dropping notification to {target}: channel closed");
                }
            }
            None => debug!("dropping notification to {target}: not connected"),
        }
    }

    #[cfg(test)]
    pub(crate) async fn members(&self, room_id: &str) -> Option<HashSet<String>> {
        self.rooms.lock().await.get(room_id).cloned()
    }
}
