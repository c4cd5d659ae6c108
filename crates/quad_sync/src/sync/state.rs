//! Controller phases and the observable state surface.

/// The lifecycle phase of one collection.
///
/// The three in-flight phases are mutually exclusive by construction: a
/// collection has at most one primary operation at a time, and the flags the
/// UI observes are derived from this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing fetched yet.
    Idle,
    /// First population in flight; nothing to display, show a spinner.
    LoadingFirst,
    /// Data loaded and stable.
    Loaded,
    /// Fetching the next page past the current superset.
    LoadingMore,
    /// Full reload in flight; previous data stays on screen. A silent
    /// refresh never surfaces an indicator (app returning to foreground).
    Refreshing { silent: bool },
    /// First population failed; a retry affordance is shown.
    Error,
}

impl Phase {
    /// Whether a primary operation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::LoadingFirst | Self::LoadingMore | Self::Refreshing { .. }
        )
    }
}

/// What the UI reads for one collection: the revealed slice plus flags.
///
/// Published as a whole on every state transition, so observers never see a
/// partially-applied update.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<E> {
    /// The revealed, filtered, sorted slice.
    pub items: Vec<E>,
    /// First population in flight.
    pub is_loading: bool,
    /// Lazy-load of the next page in flight.
    pub is_loading_more: bool,
    /// User-visible refresh in flight.
    pub is_refreshing: bool,
    /// Whether the collection ever completed a load.
    pub has_loaded_once: bool,
    /// Human-readable error, only ever set by a failed first load.
    pub error: Option<String>,
}

impl<E> Default for CollectionSnapshot<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            is_loading_more: false,
            is_refreshing: false,
            has_loaded_once: false,
            error: None,
        }
    }
}

impl<E> CollectionSnapshot<E> {
    /// True when the collection loaded successfully but holds nothing,
    /// which is an empty state rather than an error state.
    #[must_use]
    pub fn is_empty_state(&self) -> bool {
        self.has_loaded_once && self.items.is_empty() && self.error.is_none()
    }
}
