use serde::{Deserialize, Serialize};

use super::{UserId, timestamp};

/// A one-to-one chat message between an operator and a marketplace user.
///
/// Messages carry no server identifier; they are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Account that wrote the message.
    pub sender_id: UserId,

    /// Account the message was addressed to.
    pub receiver_id: UserId,

    /// Message text.
    #[serde(rename = "content")]
    pub body: String,

    /// Creation time in epoch seconds.
    #[serde(rename = "createdAt", with = "timestamp::seconds")]
    pub created_at: i64,

    /// Last update time in epoch seconds; the display order key.
    #[serde(rename = "updatedAt", with = "timestamp::seconds")]
    pub updated_at: i64,
}

impl Message {
    /// Whether the message belongs to the one-to-one conversation with `peer`.
    #[must_use]
    pub fn involves(&self, peer: &UserId) -> bool {
        &self.sender_id == peer || &self.receiver_id == peer
    }
}

/// Body of a message page response.
///
/// Deployments answer either with a bare array or with the array wrapped
/// in a `data` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessagePage {
    /// `[ {..}, {..} ]`
    List(Vec<Message>),
    /// `{ "data": [ {..}, {..} ] }`
    Wrapped {
        /// Wrapped messages.
        data: Vec<Message>,
    },
}

impl MessagePage {
    /// Unwrap into the contained messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::List(messages) | Self::Wrapped { data: messages } => messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            sender_id: UserId::from("op-1"),
            receiver_id: UserId::from("seller-9"),
            body: "Your listing is live".to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_message_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["content"], "Your listing is live");
        assert_eq!(json["sender_id"], "op-1");
        assert_eq!(json["createdAt"], 1_700_000_000);
        assert_eq!(json["updatedAt"], 1_700_000_000);
    }

    #[test]
    fn test_message_from_backend_shape() {
        let json = r#"{
            "sender_id": 12,
            "receiver_id": "34",
            "content": "hello",
            "createdAt": "2023-11-14T22:13:20.000Z",
            "updatedAt": 1700000005
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.sender_id, UserId::from(12));
        assert_eq!(message.created_at, 1_700_000_000);
        assert_eq!(message.updated_at, 1_700_000_005);
    }

    #[test]
    fn test_involves_checks_both_ends() {
        let message = sample();
        assert!(message.involves(&UserId::from("seller-9")));
        assert!(message.involves(&UserId::from("op-1")));
        assert!(!message.involves(&UserId::from("buyer-3")));
    }

    #[test]
    fn test_page_accepts_both_envelopes() {
        let bare = r#"[{"sender_id":"a","receiver_id":"b","content":"x","createdAt":1,"updatedAt":1}]"#;
        let wrapped = r#"{"data":[{"sender_id":"a","receiver_id":"b","content":"x","createdAt":1,"updatedAt":1}]}"#;
        let bare: MessagePage = serde_json::from_str(bare).unwrap();
        let wrapped: MessagePage = serde_json::from_str(wrapped).unwrap();
        assert_eq!(bare.into_messages(), wrapped.into_messages());
    }
}
