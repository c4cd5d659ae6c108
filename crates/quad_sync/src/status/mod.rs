//! Batched per-entity status resolution with a time-boxed cache.
//!
//! Screens that need membership-style lookups ("which of these communities
//! am I in?") share one explicitly constructed [`StatusCache`] and drive a
//! [`BatchedStatusResolver`], which resolves a boolean status per entity ID
//! across large ID sets using bounded-concurrency batches and publishes
//! partial results progressively.

mod cache;
mod resolver;

pub use cache::{DEFAULT_STATUS_TTL, StatusCache, StatusEntry};
pub use resolver::{
    BatchedStatusResolver, DEFAULT_BATCH_TIMEOUT, DEFAULT_CALL_TIMEOUT,
    DEFAULT_INTER_BATCH_DELAY, DEFAULT_STATUS_BATCH_SIZE, ResolverConfig, StatusSnapshot,
};
