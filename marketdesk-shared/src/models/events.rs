use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, UserId, timestamp};

/// Inbound event carrying a new one-to-one message.
pub const NEW_PRIVATE_MESSAGE: &str = "newprivateMessage";
/// Inbound event carrying a site-wide broadcast.
pub const BROADCAST_MESSAGE: &str = "broadcastMessage";
/// Outbound event sending a one-to-one message.
pub const PRIVATE_MESSAGE: &str = "privateMessage";
/// Outbound event joining the room of a peer.
pub const JOIN_PRIVATE_ROOM: &str = "joinPrivateRoom";

/// Payload of an outbound `privateMessage` emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundPrivateMessage {
    /// Message text.
    pub content: String,
    /// The sending operator.
    pub sender_id: UserId,
    /// The peer the message is addressed to.
    pub receiver_id: UserId,
    /// Role label of the sender as the backend expects it (e.g. `admin`).
    #[serde(rename = "sentBy")]
    pub sent_by: String,
}

/// Payload of an inbound `broadcastMessage` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastMessage {
    /// Broadcast text.
    #[serde(default, alias = "message")]
    pub content: Option<String>,
    /// Originating account, when present.
    #[serde(default)]
    pub sender_id: Option<UserId>,
    /// Creation time in epoch seconds, when present.
    #[serde(default, rename = "createdAt", with = "timestamp::seconds_opt")]
    pub created_at: Option<i64>,
}

/// An event received on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A new one-to-one message (`newprivateMessage`).
    NewPrivateMessage(Message),
    /// A site-wide broadcast (`broadcastMessage`); never merged into a conversation.
    Broadcast(BroadcastMessage),
    /// Any other event name.
    Other {
        /// Name of the unrecognised event.
        event: String,
    },
}

impl PushEvent {
    /// Build a typed event from an event name and its JSON payload.
    ///
    /// # Errors
    /// Fails when a known event carries a payload of the wrong shape.
    pub fn from_parts(event: &str, data: Value) -> Result<Self, serde_json::Error> {
        match event {
            NEW_PRIVATE_MESSAGE => serde_json::from_value(data).map(Self::NewPrivateMessage),
            BROADCAST_MESSAGE => match data {
                Value::String(text) => Ok(Self::Broadcast(BroadcastMessage {
                    content: Some(text),
                    ..BroadcastMessage::default()
                })),
                other => serde_json::from_value(other).map(Self::Broadcast),
            },
            other => Ok(Self::Other {
                event: other.to_string(),
            }),
        }
    }
}

/// A command emitted on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushCommand {
    /// Send a one-to-one message.
    PrivateMessage(OutboundPrivateMessage),
    /// Join the room of the given peer.
    JoinPrivateRoom(UserId),
}

impl PushCommand {
    /// Event name used on the wire.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::PrivateMessage(_) => PRIVATE_MESSAGE,
            Self::JoinPrivateRoom(_) => JOIN_PRIVATE_ROOM,
        }
    }

    /// JSON payload sent alongside the event name.
    ///
    /// # Errors
    /// Propagates serialization failures.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::PrivateMessage(message) => serde_json::to_value(message),
            Self::JoinPrivateRoom(peer) => serde_json::to_value(peer),
        }
    }
}
