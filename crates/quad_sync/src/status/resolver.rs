//! Batched, rate-limited resolution of per-entity status.
//!
//! Batches run sequentially to respect the collaborator's implicit rate
//! limit; within a batch every single-entity call runs concurrently under a
//! per-call timeout, with a per-batch deadline that cancels anything still
//! pending. Failures degrade to "not a match" per entity rather than
//! aborting the whole resolve, and the running partial mapping is published
//! after every batch so the UI can show early results.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout};

use crate::fetch::StatusSource;

use super::cache::StatusCache;

/// IDs resolved per batch.
pub const DEFAULT_STATUS_BATCH_SIZE: usize = 10;

/// Deadline for one single-entity status call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Overall deadline for one batch; pending calls are cancelled once hit.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between batches, purely for the collaborator's rate limit.
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(500);

/// Tuning for a resolver. All constants are overridable.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub batch_size: usize,
    pub call_timeout: Duration,
    pub batch_timeout: Duration,
    pub inter_batch_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_STATUS_BATCH_SIZE,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
        }
    }
}

/// The progressively published state of a resolve.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    /// Statuses resolved so far; grows batch by batch.
    pub matches: HashMap<String, bool>,
    /// True once the whole ID set has been processed.
    pub complete: bool,
}

impl StatusSnapshot {
    /// IDs currently mapped to `true`.
    #[must_use]
    pub fn matched_ids(&self) -> HashSet<String> {
        self.matches
            .iter()
            .filter(|(_, value)| **value)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Resolves a boolean status per entity ID across a large ID set.
///
/// The cache is injected, not owned: several screens share one
/// [`StatusCache`], so a forced refresh from one screen invalidates cached
/// freshness for all consumers.
pub struct BatchedStatusResolver<S> {
    source: Arc<S>,
    cache: Arc<Mutex<StatusCache>>,
    config: ResolverConfig,
    /// Serializes overlapping resolves; the second caller re-checks the
    /// cache after acquisition and usually returns without network calls.
    gate: tokio::sync::Mutex<()>,
    tx: watch::Sender<StatusSnapshot>,
}

impl<S: StatusSource + 'static> BatchedStatusResolver<S> {
    /// Create a resolver over an injected source and shared cache.
    pub fn new(source: Arc<S>, cache: Arc<Mutex<StatusCache>>, config: ResolverConfig) -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot::default());
        Self {
            source,
            cache,
            config,
            gate: tokio::sync::Mutex::new(()),
            tx,
        }
    }

    /// Subscribe to progressive results.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    fn lock_cache(&self) -> MutexGuard<'_, StatusCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve a status for every ID in `ids`.
    ///
    /// Returns the cached mapping without any network calls when the cache
    /// was computed over exactly this ID set within its TTL and
    /// `force_refresh` is false. The returned mapping always covers every
    /// requested ID; entities whose call failed or timed out map to `false`.
    pub async fn resolve(&self, ids: &HashSet<String>, force_refresh: bool) -> HashMap<String, bool> {
        if !force_refresh {
            let cache = self.lock_cache();
            if cache.is_fresh_for(ids) {
                return cache.mapping();
            }
        }

        let _gate = self.gate.lock().await;

        // A concurrent resolve may have landed while we waited on the gate.
        if !force_refresh {
            let cache = self.lock_cache();
            if cache.is_fresh_for(ids) {
                return cache.mapping();
            }
        }

        // Sorted so batch composition is stable across runs.
        let mut sorted: Vec<String> = ids.iter().cloned().collect();
        sorted.sort();

        let batch_size = self.config.batch_size.max(1);
        let mut resolved: HashMap<String, bool> = HashMap::with_capacity(sorted.len());

        for (index, batch) in sorted.chunks(batch_size).enumerate() {
            if index > 0 {
                // Fixed pause between batches for the collaborator's
                // implicit rate limit; not needed for correctness.
                sleep(self.config.inter_batch_delay).await;
            }

            let results = self.resolve_batch(batch).await;
            {
                let mut cache = self.lock_cache();
                for (id, value) in &results {
                    cache.record(id, *value);
                }
            }
            resolved.extend(results);

            // Progressive publication: observers see each batch land.
            self.tx.send_replace(StatusSnapshot {
                matches: resolved.clone(),
                complete: false,
            });
        }

        self.lock_cache().complete_full_resolve(ids);
        self.tx.send_replace(StatusSnapshot {
            matches: resolved.clone(),
            complete: true,
        });

        resolved
    }

    /// Run one batch: all calls concurrent, each under the per-call timeout,
    /// the whole batch under the batch deadline.
    async fn resolve_batch(&self, batch: &[String]) -> HashMap<String, bool> {
        // Fail-open default: anything unanswered stays a non-match.
        let mut results: HashMap<String, bool> =
            batch.iter().map(|id| (id.clone(), false)).collect();

        let mut calls = JoinSet::new();
        for id in batch {
            let source = Arc::clone(&self.source);
            let id = id.clone();
            let call_timeout = self.config.call_timeout;

            calls.spawn(async move {
                let value = match timeout(call_timeout, source.fetch_status(&id)).await {
                    Ok(Ok(value)) => value,
                    Ok(Err(err)) => {
                        if !err.is_cancelled() {
                            tracing::warn!(
                                entity = %id,
                                error = %err,
                                "status fetch failed, treating as non-match"
                            );
                        }
                        false
                    }
                    Err(_) => {
                        tracing::warn!(entity = %id, "status fetch timed out, treating as non-match");
                        false
                    }
                };
                (id, value)
            });
        }

        let deadline = Instant::now() + self.config.batch_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, calls.join_next()).await {
                Ok(Some(Ok((id, value)))) => {
                    results.insert(id, value);
                }
                Ok(Some(Err(join_err))) => {
                    tracing::warn!(error = %join_err, "status task failed, treating as non-match");
                }
                Ok(None) => break,
                Err(_) => {
                    // Batch deadline hit; cancel whatever is still pending.
                    tracing::warn!("batch deadline hit, cancelling pending status calls");
                    calls.abort_all();
                    while calls.join_next().await.is_some() {}
                    break;
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapSource {
        member_of: HashSet<String>,
        calls: AtomicUsize,
    }

    impl MapSource {
        fn new(members: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                member_of: members.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StatusSource for MapSource {
        async fn fetch_status(&self, entity_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.member_of.contains(entity_id))
        }
    }

    fn ids(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn resolver<S: StatusSource + 'static>(source: Arc<S>) -> BatchedStatusResolver<S> {
        BatchedStatusResolver::new(
            source,
            Arc::new(Mutex::new(StatusCache::default())),
            ResolverConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_answers_every_requested_id() {
        let source = MapSource::new(&["a", "c"]);
        let resolver = resolver(Arc::clone(&source));

        let mapping = resolver.resolve(&ids(&["a", "b", "c"]), false).await;
        assert_eq!(mapping.len(), 3);
        assert!(mapping["a"]);
        assert!(!mapping["b"]);
        assert!(mapping["c"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_degrade_to_non_match() {
        struct FailingSource;

        #[async_trait]
        impl StatusSource for FailingSource {
            async fn fetch_status(&self, entity_id: &str) -> Result<bool> {
                if entity_id == "bad" {
                    Err(FetchError::network("boom"))
                } else {
                    Ok(true)
                }
            }
        }

        let resolver = resolver(Arc::new(FailingSource));
        let mapping = resolver.resolve(&ids(&["good", "bad"]), false).await;
        assert!(mapping["good"]);
        assert!(!mapping["bad"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_id_set_completes_immediately() {
        let source = MapSource::new(&[]);
        let resolver = resolver(Arc::clone(&source));

        let mapping = resolver.resolve(&HashSet::new(), false).await;
        assert!(mapping.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(resolver.subscribe().borrow().complete);
    }
}
