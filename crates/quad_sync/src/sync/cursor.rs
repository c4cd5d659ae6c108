//! Network pagination bookkeeping for one collection.

/// Tracks where the next network page starts and whether one exists.
///
/// There is no explicit total-count field from the collaborator; a page
/// shorter than the page size is the sole signal that remote pagination is
/// exhausted. Once false, `has_more_remote` stays false until [`reset`].
///
/// [`reset`]: PagedCursor::reset
#[derive(Debug, Clone)]
pub struct PagedCursor {
    offset: usize,
    page_size: usize,
    has_more_remote: bool,
}

impl PagedCursor {
    /// Create a cursor at offset zero.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size,
            has_more_remote: true,
        }
    }

    /// Rewind to offset zero and assume more data exists.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.has_more_remote = true;
    }

    /// Record a successfully fetched page of `returned` items.
    ///
    /// A short page latches `has_more_remote` to false.
    pub fn advance(&mut self, returned: usize) {
        self.offset += returned;
        self.has_more_remote = self.has_more_remote && returned >= self.page_size;
    }

    /// Offset of the next unfetched item.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The fixed page size requested from the collaborator.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whether the collaborator may still hold unfetched items.
    #[must_use]
    pub fn has_more_remote(&self) -> bool {
        self.has_more_remote
    }
}
