//! Live delivery routing for the shared push channel.
//!
//! The push connection is process-wide, so every inbound message is routed
//! through the single active registration. A conversation switch replaces
//! the registration with a new one bound to the new peer and generation;
//! nothing is captured from the previous conversation.

use shared::models::{Message, UserId};
use tracing::debug;

use crate::store::Generation;

/// Registration of the open conversation on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveListener {
    generation: Generation,
    peer: UserId,
}

impl LiveListener {
    /// Generation the listener was registered under.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Peer the listener accepts messages for.
    #[must_use]
    pub const fn peer(&self) -> &UserId {
        &self.peer
    }

    /// Whether `message` belongs to this listener's conversation.
    #[must_use]
    pub fn accepts(&self, message: &Message) -> bool {
        message.involves(&self.peer)
    }
}

/// Holds at most one active [`LiveListener`].
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    active: Option<LiveListener>,
}

impl ListenerRegistry {
    /// Register a listener for `peer`, deregistering and returning the previous one.
    pub fn register(&mut self, generation: Generation, peer: UserId) -> Option<LiveListener> {
        let previous = self.active.replace(LiveListener { generation, peer });
        if let Some(old) = &previous {
            debug!(peer = %old.peer, generation = %old.generation, "live listener deregistered");
        }
        previous
    }

    /// Remove the active listener.
    pub fn deregister(&mut self) -> Option<LiveListener> {
        self.active.take()
    }

    /// Generation of the listener that accepts `message`, if any.
    #[must_use]
    pub fn route(&self, message: &Message) -> Option<Generation> {
        self.active
            .as_ref()
            .filter(|listener| listener.accepts(message))
            .map(LiveListener::generation)
    }

    /// The active listener.
    #[must_use]
    pub const fn active(&self) -> Option<&LiveListener> {
        self.active.as_ref()
    }
}
