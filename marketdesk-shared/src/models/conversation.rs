use serde::{Deserialize, Serialize};

use super::{UserId, timestamp};

/// One row of the operator's conversation list (`/message/chatList/{userId}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    /// The other participant of the conversation.
    #[serde(alias = "id", alias = "user_id")]
    pub peer_id: UserId,

    /// Display name of the peer, when the backend provides one.
    #[serde(default, alias = "username", alias = "fullName")]
    pub name: Option<String>,

    /// Excerpt of the most recent message.
    #[serde(default, alias = "lastMessage")]
    pub last_message: Option<String>,

    /// Time of the most recent message in epoch seconds.
    #[serde(
        default,
        alias = "updatedAt",
        with = "timestamp::seconds_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<i64>,
}

/// Body of the conversation list response (bare array or `data`-wrapped).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConversationList {
    /// `[ {..} ]`
    List(Vec<ConversationSummary>),
    /// `{ "data": [ {..} ] }`
    Wrapped {
        /// Wrapped rows.
        data: Vec<ConversationSummary>,
    },
}

impl ConversationList {
    /// Unwrap into the contained rows.
    #[must_use]
    pub fn into_summaries(self) -> Vec<ConversationSummary> {
        match self {
            Self::List(rows) | Self::Wrapped { data: rows } => rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_aliases() {
        let json = r#"{"id": 5, "username": "acme-store", "lastMessage": "thanks", "updatedAt": "2023-11-14T22:13:20Z", "avatar": "x.png"}"#;
        let summary: ConversationSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.peer_id, UserId::from(5));
        assert_eq!(summary.name.as_deref(), Some("acme-store"));
        assert_eq!(summary.last_message.as_deref(), Some("thanks"));
        assert_eq!(summary.updated_at, Some(1_700_000_000));
    }

    #[test]
    fn test_summary_minimal() {
        let summary: ConversationSummary = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(summary.peer_id.as_str(), "u1");
        assert!(summary.name.is_none());
        assert!(summary.updated_at.is_none());
    }

    #[test]
    fn test_list_wrapped() {
        let list: ConversationList =
            serde_json::from_str(r#"{"data":[{"peer_id":"a"},{"peer_id":"b"}]}"#).unwrap();
        assert_eq!(list.into_summaries().len(), 2);
    }
}
