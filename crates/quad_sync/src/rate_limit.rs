//! Proactive rate limiting for collaborator calls.
//!
//! Multiple collections may have in-flight fetches simultaneously (there is
//! no cross-collection lock), so the transport is the right place to pace
//! requests against the platform API. [`RateLimited`] wraps any collaborator
//! and waits for the limiter before delegating.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::fetch::{CollectionKind, Page, PageSource, Result, StatusSource};
use crate::filter::ServerFilters;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default requests per second against the platform API.
pub const DEFAULT_API_RPS: u32 = 10;

/// A standalone API rate limiter using the governor crate.
///
/// # Example
///
/// ```ignore
/// use quad_sync::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// transport.fetch_page(..).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// A zero rate is clamped to one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// A rate-limited wrapper around any collaborator.
///
/// Implements both [`PageSource`] and [`StatusSource`] by delegation, so a
/// single wrapped transport can back every controller and resolver.
pub struct RateLimited<S> {
    inner: S,
    limiter: ApiRateLimiter,
}

impl<S> RateLimited<S> {
    /// Wrap a collaborator with the given requests-per-second budget.
    pub fn new(inner: S, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }

    /// Get a reference to the inner collaborator.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Clone> Clone for RateLimited<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<S: PageSource> PageSource for RateLimited<S> {
    type Entity = S::Entity;

    async fn fetch_page(
        &self,
        kind: CollectionKind,
        filters: &ServerFilters,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Self::Entity>> {
        self.limiter.wait().await;
        self.inner.fetch_page(kind, filters, offset, limit).await
    }
}

#[async_trait]
impl<S: StatusSource> StatusSource for RateLimited<S> {
    async fn fetch_status(&self, entity_id: &str) -> Result<bool> {
        self.limiter.wait().await;
        self.inner.fetch_status(entity_id).await
    }
}
