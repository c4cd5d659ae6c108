//! Quad Sync - the collection synchronization engine for the Quad client.
//!
//! This library implements the data-loading core shared by every list-backed
//! screen in the client: communities, events, campaigns, marketplace
//! products, members, and board members. Each screen instantiates one
//! [`CollectionSyncController`], which fetches pages from a remote
//! collaborator, buffers them locally, and reveals them to the UI in smaller
//! increments so scrolling never waits on the network more often than it
//! has to.
//!
//! Membership-style lookups ("which of these communities am I in?") go
//! through [`BatchedStatusResolver`], which resolves a per-entity status
//! across large ID sets using rate-limited batches, a TTL cache, and
//! progressive partial results.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quad_sync::{CollectionKind, CollectionSyncController, SyncConfig};
//!
//! let controller = Arc::new(CollectionSyncController::new(
//!     CollectionKind::Events,
//!     Arc::new(transport),
//!     SyncConfig::for_kind(CollectionKind::Events),
//! ));
//! let mut state = controller.subscribe();
//!
//! controller.load().await;
//! // ... on scroll-near-bottom:
//! controller.load_more().await;
//! ```

pub mod fetch;
pub mod filter;
pub mod rate_limit;
pub mod retry;
pub mod status;
pub mod sync;

pub use fetch::{CollectionKind, FetchError, Identified, Page, PageSource, StatusSource};
pub use filter::{FilterSpec, Matchable, ServerFilters, SortKey, filter_and_sort};
pub use rate_limit::{ApiRateLimiter, DEFAULT_API_RPS, RateLimited};
pub use retry::{RetryConfig, with_retry};
pub use status::{BatchedStatusResolver, ResolverConfig, StatusCache, StatusSnapshot};
pub use sync::{
    CollectionSnapshot, CollectionSyncController, PagedCursor, RevealWindow, SyncConfig,
};
