//! Shared retry utilities for collaborator calls.
//!
//! The original client repeated ad hoc sleep-and-loop retry code in every
//! collection view model; this module is the single parameterized
//! replacement. Retries only protect the very first population of a screen
//! (a cold start failing silently would show a dead screen); everything
//! after that runs with a single attempt to keep interactive latency
//! predictable.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::fetch::{FetchError, Result};

/// Attempts for the first population of a collection.
pub const FIRST_LOAD_ATTEMPTS: usize = 3;

/// Base backoff delay in milliseconds; doubles per attempt, no jitter.
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry; doubles for each one after.
    pub base_delay: Duration,
    /// Total attempts, including the initial call.
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::first_load()
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom values.
    #[must_use]
    pub fn new(base_delay: Duration, max_attempts: usize) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// The policy protecting a collection's first load.
    #[must_use]
    pub fn first_load() -> Self {
        Self {
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_attempts: FIRST_LOAD_ATTEMPTS,
        }
    }

    /// No retries at all; used for user-initiated refreshes and lazy loads.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self {
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_attempts: 1,
        }
    }

    /// Build an exponential backoff strategy from this configuration.
    ///
    /// Jitter is deliberately off: the delays back a single user's screen,
    /// not a fleet, and tests assert the exact schedule.
    #[must_use]
    pub fn into_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Execute a collaborator call with automatic retry on transient failures.
///
/// Cancellation and timeout return immediately; decoding mismatches are not
/// retried either, since the payload will not change shape on a second
/// attempt. Each retry is logged at debug level.
pub async fn with_retry<T, F, Fut>(operation: F, config: &RetryConfig) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    operation
        .retry(config.into_backoff())
        .when(FetchError::is_retryable)
        .notify(|err: &FetchError, dur: Duration| {
            tracing::debug!("transient fetch failure, retrying in {:?}: {}", dur, err);
        })
        .await
}
