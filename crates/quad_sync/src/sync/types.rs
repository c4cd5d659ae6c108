//! Shared configuration for collection controllers.

use crate::fetch::CollectionKind;
use crate::retry::RetryConfig;

/// Default network page size when no per-collection tuning applies.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default reveal increment per scroll event.
pub const DEFAULT_REVEAL_BATCH: usize = 10;

/// Tuning for one collection controller. All constants are overridable.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Items fetched per network page.
    pub page_size: usize,
    /// Items revealed per scroll increment; at most `page_size`.
    pub reveal_batch: usize,
    /// Retry policy for the collection's first population.
    pub first_load_retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reveal_batch: DEFAULT_REVEAL_BATCH,
            first_load_retry: RetryConfig::first_load(),
        }
    }
}

impl SyncConfig {
    /// Per-collection defaults (page sizes 20-50 depending on collection).
    #[must_use]
    pub fn for_kind(kind: CollectionKind) -> Self {
        Self {
            page_size: kind.default_page_size(),
            reveal_batch: kind.default_reveal_batch(),
            first_load_retry: RetryConfig::first_load(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_kind_respects_collection_tuning() {
        let config = SyncConfig::for_kind(CollectionKind::Products);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.reveal_batch, 25);

        let config = SyncConfig::for_kind(CollectionKind::Events);
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.reveal_batch <= config.page_size);
        assert_eq!(config.first_load_retry.max_attempts, 3);
    }
}
