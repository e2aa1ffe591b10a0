#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(warnings, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Chat session core for MarketDesk.
//!
//! A [`ChatController`] keeps the open conversation's message list in
//! chronological order while three sources feed it: paginated history from
//! the REST API, live pushes from the WebSocket channel, and messages the
//! operator sends. Switching conversations bumps a generation counter so
//! results that belong to a previous conversation are dropped.

pub mod api;
pub mod cursor;
pub mod entry;
pub mod error;
pub mod listener;
pub mod merge;
pub mod push;
pub mod session;
pub mod store;

pub use api::{MarketDeskClient, MessageSource};
pub use cursor::{CursorState, PageKind, PageRequest, PaginationCursor};
pub use entry::ChatEntry;
pub use error::{ChatError, ChatResult};
pub use listener::{ListenerRegistry, LiveListener};
pub use merge::{Placement, is_chronological, merge};
pub use push::{PushConnection, PushHandle, PushSettings, PushSink, connect};
pub use session::{ChatCommand, ChatController, ChatHandle, ChatSettings, PageCompletion, ViewUpdate};
pub use store::{ChatSessionStore, Generation, LiveOutcome, PageOutcome, PageTicket, ViewEffect};
