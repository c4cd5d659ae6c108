//! Collaborator contracts for the sync engine.
//!
//! The engine talks to the outside world through two narrow interfaces: a
//! paged-fetch call ([`PageSource`]) and a single-entity status call
//! ([`StatusSource`]). The REST transport, serialization of individual
//! entities, and session handling all live behind these traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::filter::{Matchable, ServerFilters};

/// Errors that can occur when calling a collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The operation was deliberately aborted. Never surfaced, never
    /// retried, never logged as a failure.
    #[error("operation cancelled")]
    Cancelled,

    /// A local deadline fired before the collaborator answered.
    #[error("operation timed out")]
    Timeout,

    /// The collaborator call failed for any other transient reason.
    #[error("network error: {message}")]
    Network { message: String },

    /// The payload did not match the expected shape. Not retryable.
    #[error("unexpected payload: {message}")]
    Decoding { message: String },
}

impl FetchError {
    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a decoding error.
    #[inline]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Check if this error should be retried.
    ///
    /// Cancellation and timeout mean the caller no longer wants the result
    /// or a stricter local deadline already fired; a decoding mismatch will
    /// not fix itself on retry. Only plain network failures qualify.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if this error is a deliberate cancellation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that include multi-line details.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for collaborator operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// The collections tracked by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Communities,
    Events,
    Campaigns,
    Products,
    Members,
    BoardMembers,
}

impl CollectionKind {
    /// Stable identifier used for routing and logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Communities => "communities",
            Self::Events => "events",
            Self::Campaigns => "campaigns",
            Self::Products => "products",
            Self::Members => "members",
            Self::BoardMembers => "board_members",
        }
    }

    /// Natural page size for this collection's endpoint.
    ///
    /// The marketplace returns lightweight rows and tolerates bigger pages;
    /// member lists sit in between.
    #[must_use]
    pub fn default_page_size(&self) -> usize {
        match self {
            Self::Products => 50,
            Self::Members => 30,
            _ => 20,
        }
    }

    /// How many items the UI reveals per scroll increment.
    ///
    /// Always at most the page size, so one network round trip satisfies
    /// several scroll events.
    #[must_use]
    pub fn default_reveal_batch(&self) -> usize {
        match self {
            Self::Products => 25,
            Self::Members => 15,
            _ => 10,
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity with a stable identity.
///
/// The engine is generic over the payload; identity is the only field it
/// ever inspects directly (for deduplication and sort tie-breaks).
pub trait Identified {
    /// The stable identity of this entity.
    fn id(&self) -> &str;
}

/// One page of entities returned by the paged-fetch collaborator.
#[derive(Debug, Clone)]
pub struct Page<E> {
    /// Entities on this page, in server order.
    pub items: Vec<E>,
    /// Server's own "more data available" hint, if it sends one.
    ///
    /// A page shorter than the requested limit is authoritative; the hint is
    /// ignored whenever the two disagree.
    pub has_more_hint: Option<bool>,
}

impl<E> Page<E> {
    /// Create a page without a server-side pagination hint.
    pub fn new(items: Vec<E>) -> Self {
        Self {
            items,
            has_more_hint: None,
        }
    }
}

/// Paged-fetch collaborator (the REST transport).
#[async_trait]
pub trait PageSource: Send + Sync {
    /// The entity payload this source produces.
    type Entity: Matchable + Clone + Send + Sync + 'static;

    /// Fetch one page of a collection.
    ///
    /// `filters` carries only the server-evaluated portion of the active
    /// filter configuration; locally evaluated predicates never reach the
    /// collaborator.
    async fn fetch_page(
        &self,
        kind: CollectionKind,
        filters: &ServerFilters,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Self::Entity>>;
}

/// Single-entity status collaborator.
///
/// Implementations must support per-call cancellation; the resolver wraps
/// every call in its own timeout on top.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Resolve the status of one entity (e.g. "am I a member?").
    async fn fetch_status(&self, entity_id: &str) -> Result<bool>;
}
