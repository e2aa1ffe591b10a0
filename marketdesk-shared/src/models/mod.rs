pub mod conversation;
pub mod errors;
pub mod events;
pub mod message;
pub mod timestamp;
pub mod user;

pub use conversation::{ConversationList, ConversationSummary};
pub use errors::ErrorResponse;
pub use events::{
    BROADCAST_MESSAGE, BroadcastMessage, JOIN_PRIVATE_ROOM, NEW_PRIVATE_MESSAGE,
    OutboundPrivateMessage, PRIVATE_MESSAGE, PushCommand, PushEvent,
};
pub use message::{Message, MessagePage};
pub use user::UserId;
