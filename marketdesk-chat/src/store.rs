//! # Chat session store
//!
//! Holds the ordered message list of the open conversation and reconciles
//! its three inputs: the initial page, older pages, and live pushes. Every
//! mutation re-sorts through [`merge`], so the list stays chronological no
//! matter in which order async completions arrive.
//!
//! Each [`initialize`](ChatSessionStore::initialize) starts a new
//! [`Generation`]. Page results are tagged with the generation they were
//! requested under and dropped when it is no longer current.

use std::{fmt, mem};

use shared::models::{Message, UserId};
use tracing::{debug, info, warn};

use crate::{
    cursor::{CursorState, PageKind, PageRequest, PaginationCursor},
    entry::ChatEntry,
    error::ChatError,
    merge::{Placement, merge},
};

/// Epoch counter bumped on every conversation switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The following generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A page fetch to perform, tagged with the generation that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    /// Generation the request belongs to.
    pub generation: Generation,
    /// Peer of the conversation being paged.
    pub peer: UserId,
    /// Offset window.
    pub request: PageRequest,
}

/// What the view should do after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEffect {
    /// Jump to the newest message (initial page loaded).
    ScrollToBottom,
    /// Keep the current top anchor (older page loaded above it).
    PreserveAnchor,
    /// Re-render without moving the viewport.
    Refresh,
}

/// Result of applying a page completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was merged.
    Applied(ViewEffect),
    /// The fetch failed; the list is unchanged.
    Failed,
    /// The page belonged to an earlier conversation and was dropped.
    Stale,
}

/// Result of offering a live message to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// Appended as a new entry.
    Appended,
    /// Replaced the pending local copy of the same message.
    Reconciled,
    /// Not part of the open conversation.
    Rejected,
}

/// Authoritative message list of the open conversation.
#[derive(Debug)]
pub struct ChatSessionStore {
    self_id: UserId,
    peer: Option<UserId>,
    generation: Generation,
    entries: Vec<ChatEntry>,
    cursor: PaginationCursor,
    page_size: usize,
    echo_window_secs: i64,
    last_error: Option<String>,
}

impl ChatSessionStore {
    /// Empty store for the operator `self_id`; no conversation is open yet.
    #[must_use]
    pub const fn new(self_id: UserId, page_size: usize, echo_window_secs: i64) -> Self {
        Self {
            self_id,
            peer: None,
            generation: Generation(0),
            entries: Vec::new(),
            cursor: PaginationCursor::new(page_size),
            page_size,
            echo_window_secs,
            last_error: None,
        }
    }

    /// Open the conversation with `peer`, discarding all state of the
    /// previous one, and return the first-page request.
    pub fn initialize(&mut self, peer: UserId) -> PageTicket {
        self.generation = self.generation.next();
        self.entries.clear();
        self.cursor = PaginationCursor::new(self.page_size);
        self.last_error = None;
        self.peer = Some(peer.clone());
        info!(peer = %peer, generation = %self.generation, "conversation opened");

        let request = self
            .cursor
            .begin()
            .unwrap_or(PageRequest {
                start: 0,
                count: self.page_size,
                kind: PageKind::Initial,
            });
        PageTicket {
            generation: self.generation,
            peer,
            request,
        }
    }

    /// Request the next older page, unless the cursor is exhausted, a fetch
    /// is already in flight, or no conversation is open.
    pub fn request_older(&mut self) -> Option<PageTicket> {
        let peer = self.peer.clone()?;
        let Some(request) = self.cursor.begin() else {
            debug!(
                peer = %peer,
                exhausted = self.cursor.is_exhausted(),
                loading = self.cursor.is_loading(),
                "backward fetch suppressed"
            );
            return None;
        };
        Some(PageTicket {
            generation: self.generation,
            peer,
            request,
        })
    }

    /// Re-issue the fetch that last failed.
    pub fn retry(&mut self) -> Option<PageTicket> {
        if self.last_error.is_none() {
            return None;
        }
        let ticket = self.request_older()?;
        self.last_error = None;
        Some(ticket)
    }

    /// Apply the completion of a page fetch issued under `generation`.
    ///
    /// A successful page is merged and clears any earlier fetch failure. A
    /// failed page leaves the list untouched and records the error so the
    /// view can offer a retry.
    ///
    /// # Arguments
    /// * `generation` - The generation carried by the [`PageTicket`] the fetch was issued for.
    /// * `kind` - Whether the fetch was the first page or an older one.
    /// * `result` - The fetched messages or the fetch failure.
    ///
    /// # Returns
    /// [`PageOutcome::Stale`] when the conversation has since been switched,
    /// [`PageOutcome::Failed`] on error, otherwise the viewport effect to apply.
    pub fn complete_page(
        &mut self,
        generation: Generation,
        kind: PageKind,
        result: Result<Vec<Message>, ChatError>,
    ) -> PageOutcome {
        if generation != self.generation {
            debug!(
                stale = %generation,
                current = %self.generation,
                "discarding page from a previous conversation"
            );
            return PageOutcome::Stale;
        }

        match result {
            Ok(messages) => {
                let received = messages.len();
                self.last_error = None;
                let state = self.prepend_older(messages);
                debug!(received, loaded = self.cursor.loaded_count(), ?state, "page merged");
                PageOutcome::Applied(match kind {
                    PageKind::Initial => ViewEffect::ScrollToBottom,
                    PageKind::Older => ViewEffect::PreserveAnchor,
                })
            }
            Err(err) => {
                warn!(error = %err, ?kind, "message page fetch failed");
                self.cursor.fail();
                self.last_error = Some(err.to_string());
                PageOutcome::Failed
            }
        }
    }

    /// Insert a batch of older messages, re-sort, and advance the cursor.
    ///
    /// A batch shorter than the page size exhausts the cursor.
    pub fn prepend_older(&mut self, messages: Vec<Message>) -> CursorState {
        let received = messages.len();
        let batch = messages.into_iter().map(ChatEntry::confirmed).collect();
        self.entries = merge(mem::take(&mut self.entries), batch, Placement::Front);
        self.cursor.complete(received)
    }

    /// Offer a live message. Only messages to or from the open peer are
    /// accepted; the echo of a pending local send replaces it.
    pub fn append_live(&mut self, message: Message) -> LiveOutcome {
        let Some(peer) = &self.peer else {
            return LiveOutcome::Rejected;
        };
        if !message.involves(peer) {
            debug!(
                sender = %message.sender_id,
                receiver = %message.receiver_id,
                "live message for another conversation ignored"
            );
            return LiveOutcome::Rejected;
        }

        let echo_of = (message.sender_id == self.self_id)
            .then(|| self.pending_echo_position(&message))
            .flatten();

        let outcome = if let Some(position) = echo_of {
            self.entries.remove(position);
            LiveOutcome::Reconciled
        } else {
            LiveOutcome::Appended
        };
        self.entries = merge(
            mem::take(&mut self.entries),
            vec![ChatEntry::confirmed(message)],
            Placement::Back,
        );
        outcome
    }

    fn pending_echo_position(&self, echo: &Message) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.is_pending()
                && entry.message.sender_id == echo.sender_id
                && entry.message.receiver_id == echo.receiver_id
                && entry.message.body == echo.body
                && echo.updated_at.abs_diff(entry.message.created_at)
                    <= self.echo_window_secs.unsigned_abs()
        })
    }

    /// Optimistically append a message written by the operator at `now`
    /// (epoch seconds) and return it for sending.
    ///
    /// # Errors
    /// Returns [`ChatError::NoActiveConversation`] when no conversation is open.
    pub fn append_local(&mut self, body: String, now: i64) -> Result<Message, ChatError> {
        let peer = self.peer.clone().ok_or(ChatError::NoActiveConversation)?;
        let message = Message {
            sender_id: self.self_id.clone(),
            receiver_id: peer,
            body,
            created_at: now,
            updated_at: now,
        };
        self.entries = merge(
            mem::take(&mut self.entries),
            vec![ChatEntry::pending(message.clone())],
            Placement::Back,
        );
        Ok(message)
    }

    /// The displayed list, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Peer of the open conversation.
    #[must_use]
    pub const fn peer(&self) -> Option<&UserId> {
        self.peer.as_ref()
    }

    /// The signed-in operator.
    #[must_use]
    pub const fn self_id(&self) -> &UserId {
        &self.self_id
    }

    /// Current conversation generation.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Pagination cursor of the open conversation.
    #[must_use]
    pub const fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// Message of the last failed fetch, cleared by a retry or a switch.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
