//! The reveal window: the visible prefix of a locally buffered superset.
//!
//! Network pages arrive in the collaborator's natural page size, but the UI
//! reveals items in the same or smaller increments, so one round trip can
//! satisfy several "scrolled near bottom" events without re-hitting the
//! network. The window only asks for a network page once local data is
//! exhausted.

/// Size of the prefix of the filtered superset currently shown.
#[derive(Debug, Clone)]
pub struct RevealWindow {
    revealed: usize,
    batch: usize,
}

impl RevealWindow {
    /// Create an empty window revealing `batch` items per growth step.
    #[must_use]
    pub fn new(batch: usize) -> Self {
        Self { revealed: 0, batch }
    }

    /// Number of items currently revealed.
    #[must_use]
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// Whether a "scrolled near bottom" event has anything left to show.
    ///
    /// True if unrevealed local data exists, or the window has caught up
    /// with the buffer and the collaborator may still hold more.
    #[must_use]
    pub fn needs_more(&self, filtered_len: usize, has_more_remote: bool) -> bool {
        self.revealed < filtered_len || (self.revealed == filtered_len && has_more_remote)
    }

    /// Grow the window over already-buffered data; no network involved.
    ///
    /// Returns how many items became newly visible.
    pub fn grow(&mut self, filtered_len: usize) -> usize {
        let grown = self.batch.min(filtered_len.saturating_sub(self.revealed));
        self.revealed += grown;
        grown
    }

    /// Re-derive the window after a load or refresh replaced the superset.
    pub fn reset_to_first_page(&mut self, filtered_len: usize, page_size: usize) {
        self.revealed = page_size.min(filtered_len);
    }

    /// Shrink the window if the filtered superset shrank under it.
    pub fn clamp(&mut self, filtered_len: usize) {
        self.revealed = self.revealed.min(filtered_len);
    }
}
