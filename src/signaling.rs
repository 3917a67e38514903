use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Messages sent from client to the relay.
///
/// Frames are JSON objects tagged by `type`. Anything with an unrecognized
/// tag decodes to `Unknown` and is dropped by the dispatcher without closing
/// the connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join a room, creating it if it does not exist yet.
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default)]
        room_id: String,
    },
    /// SDP offer relayed point-to-point to `to`.
    Offer(DirectedSignal),
    /// SDP answer relayed point-to-point to `to`.
    Answer(DirectedSignal),
    /// ICE candidate relayed point-to-point to `to`.
    Candidate(DirectedSignal),
    /// Leave a room. Leaving a room never joined is a no-op.
    #[serde(rename_all = "camelCase")]
    Leave {
        #[serde(default)]
        room_id: String,
    },
    #[serde(other)]
    Unknown,
}

/// Which of the three directed signaling frames is being relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
        }
    }
}

/// Addressing fields of an offer/answer/candidate frame plus the opaque
/// remainder of the message. The relay forwards `payload` verbatim; it never
/// looks inside SDP or candidate blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectedSignal {
    #[serde(rename = "roomId", default)]
    pub room_id: String,
    #[serde(default)]
    pub to: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl DirectedSignal {
    /// Rebuild the wire frame for delivery to the target: the original
    /// message with its `type` restored and `from` stamped with the sender's
    /// client id.
    pub fn forwarded_frame(&self, kind: SignalKind, from: &str) -> String {
        let mut frame = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        frame.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        frame.insert("from".to_string(), Value::String(from.to_string()));
        Value::Object(frame).to_string()
    }
}

/// Messages the relay itself produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Tells a freshly connected client its own address, once, at connect.
    #[serde(rename_all = "camelCase")]
    ClientId { client_id: String },
    /// Presence notification: `user_id` entered a room the recipient is in.
    #[serde(rename_all = "camelCase")]
    UserJoined { user_id: String },
    /// Presence notification: `user_id` left a room the recipient is in.
    #[serde(rename_all = "camelCase")]
    UserLeft { user_id: String },
}

impl ServerEvent {
    pub fn to_frame(&self) -> String {
        // Serialization of these enums cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Generate a unique client ID.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}
