//! Backward pagination cursor with single-flight discipline.

/// Pagination state of the open conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Older pages may still exist.
    Fetchable,
    /// A short page was received; terminal for the conversation.
    Exhausted,
}

/// Which page a request loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// The most recent page, loaded when a conversation opens.
    Initial,
    /// An older page, loaded when the viewport reaches the top.
    Older,
}

/// Offset window of a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of messages already loaded (`startMessage`).
    pub start: usize,
    /// Page size (`count`).
    pub count: usize,
    /// Initial or older page.
    pub kind: PageKind,
}

/// Tracks how much history is loaded and whether more exists.
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    page_size: usize,
    loaded_count: usize,
    state: CursorState,
    in_flight: bool,
}

impl PaginationCursor {
    /// Fresh cursor at offset zero.
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            page_size,
            loaded_count: 0,
            state: CursorState::Fetchable,
            in_flight: false,
        }
    }

    /// Start a fetch of the next page.
    ///
    /// Returns `None` when the cursor is exhausted or a fetch is already in
    /// flight; otherwise marks the cursor as loading.
    pub fn begin(&mut self) -> Option<PageRequest> {
        if self.in_flight || self.state == CursorState::Exhausted {
            return None;
        }
        self.in_flight = true;
        Some(PageRequest {
            start: self.loaded_count,
            count: self.page_size,
            kind: if self.loaded_count == 0 {
                PageKind::Initial
            } else {
                PageKind::Older
            },
        })
    }

    /// Record a successful fetch that returned `received` messages.
    pub fn complete(&mut self, received: usize) -> CursorState {
        self.in_flight = false;
        if self.state == CursorState::Exhausted {
            return self.state;
        }
        if received >= self.page_size {
            self.loaded_count += self.page_size;
        } else {
            self.loaded_count += received;
            self.state = CursorState::Exhausted;
        }
        self.state
    }

    /// Record a failed fetch; the cursor keeps its position.
    pub fn fail(&mut self) {
        self.in_flight = false;
    }

    /// Messages loaded so far.
    #[must_use]
    pub const fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Whether no further pages will be requested.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.in_flight
    }
}
