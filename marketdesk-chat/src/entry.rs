use shared::models::Message;
use uuid::Uuid;

/// A message as displayed in the active conversation.
///
/// Entries created by an optimistic local send carry a temporary `local_id`
/// until the server echo of the same message replaces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    /// The message itself.
    pub message: Message,
    /// Temporary identifier of a pending local send.
    pub local_id: Option<Uuid>,
}

impl ChatEntry {
    /// Entry for a message known to the server.
    #[must_use]
    pub const fn confirmed(message: Message) -> Self {
        Self {
            message,
            local_id: None,
        }
    }

    /// Entry for an optimistic local send awaiting its server echo.
    #[must_use]
    pub fn pending(message: Message) -> Self {
        Self {
            message,
            local_id: Some(Uuid::new_v4()),
        }
    }

    /// Whether the entry is still awaiting its server echo.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.local_id.is_some()
    }

    /// Display order key.
    #[must_use]
    pub const fn updated_at(&self) -> i64 {
        self.message.updated_at
    }
}

impl From<Message> for ChatEntry {
    fn from(message: Message) -> Self {
        Self::confirmed(message)
    }
}
