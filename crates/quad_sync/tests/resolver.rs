//! Integration tests for batched status resolution.
//!
//! Key scenarios tested:
//! - A fresh cache answers repeat resolves with zero network calls
//! - TTL expiry and ID-set mismatch both force a fresh resolve
//! - Per-call and per-batch timeouts degrade to "not a match"
//! - Partial mappings are published progressively, batch by batch

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quad_sync::fetch::Result as FetchResult;
use quad_sync::{
    BatchedStatusResolver, FetchError, ResolverConfig, StatusCache, StatusSource,
};

/// Answers membership from a fixed set; IDs listed in `hung` never answer.
struct MemberSource {
    member_of: HashSet<String>,
    hung: HashSet<String>,
    calls: AtomicUsize,
}

impl MemberSource {
    fn new(members: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            member_of: members.iter().map(|s| s.to_string()).collect(),
            hung: HashSet::new(),
            calls: AtomicUsize::new(0),
        })
    }

    fn with_hung(members: &[&str], hung: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            member_of: members.iter().map(|s| s.to_string()).collect(),
            hung: hung.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for MemberSource {
    async fn fetch_status(&self, entity_id: &str) -> FetchResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hung.contains(entity_id) {
            std::future::pending::<()>().await;
        }
        Ok(self.member_of.contains(entity_id))
    }
}

fn ids(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn shared_cache() -> Arc<Mutex<StatusCache>> {
    Arc::new(Mutex::new(StatusCache::default()))
}

fn resolver(source: Arc<MemberSource>) -> BatchedStatusResolver<MemberSource> {
    BatchedStatusResolver::new(source, shared_cache(), ResolverConfig::default())
}

// ─── Caching ───────────────────────────────────────────────────────────────────

/// Scenario: three IDs resolve in one batch and one network round; a second
/// resolve within the TTL makes zero calls.
#[tokio::test(start_paused = true)]
async fn repeat_resolve_within_ttl_hits_cache() {
    let source = MemberSource::new(&["a", "c"]);
    let resolver = resolver(Arc::clone(&source));

    let first = resolver.resolve(&ids(&["a", "b", "c"]), false).await;
    assert_eq!(source.calls(), 3);

    let second = resolver.resolve(&ids(&["a", "b", "c"]), false).await;
    assert_eq!(source.calls(), 3, "cache hit must make zero network calls");
    assert_eq!(first, second);
}

/// Cache TTL: fresh at TTL - 1, a full new resolve at TTL + 1.
#[tokio::test(start_paused = true)]
async fn cache_expires_at_ttl() {
    let source = MemberSource::new(&["a"]);
    let resolver = resolver(Arc::clone(&source));
    let id_set = ids(&["a", "b"]);

    resolver.resolve(&id_set, false).await;
    assert_eq!(source.calls(), 2);

    tokio::time::advance(Duration::from_secs(299)).await;
    resolver.resolve(&id_set, false).await;
    assert_eq!(source.calls(), 2);

    tokio::time::advance(Duration::from_secs(2)).await;
    resolver.resolve(&id_set, false).await;
    assert_eq!(source.calls(), 4);
}

/// The cache answers only for the exact ID set it was computed over.
#[tokio::test(start_paused = true)]
async fn id_set_mismatch_forces_fresh_resolve() {
    let source = MemberSource::new(&["a"]);
    let resolver = resolver(Arc::clone(&source));

    resolver.resolve(&ids(&["a", "b"]), false).await;
    assert_eq!(source.calls(), 2);

    resolver.resolve(&ids(&["a", "b", "c"]), false).await;
    assert_eq!(source.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_bypasses_a_fresh_cache() {
    let source = MemberSource::new(&["a"]);
    let resolver = resolver(Arc::clone(&source));
    let id_set = ids(&["a", "b"]);

    resolver.resolve(&id_set, false).await;
    resolver.resolve(&id_set, true).await;
    assert_eq!(source.calls(), 4);
}

/// The cache is shared: a resolve through one resolver satisfies another
/// resolver built over the same injected cache.
#[tokio::test(start_paused = true)]
async fn injected_cache_is_shared_across_consumers() {
    let cache = shared_cache();
    let source_a = MemberSource::new(&["a"]);
    let source_b = MemberSource::new(&["a"]);
    let first =
        BatchedStatusResolver::new(Arc::clone(&source_a), Arc::clone(&cache), ResolverConfig::default());
    let second =
        BatchedStatusResolver::new(Arc::clone(&source_b), cache, ResolverConfig::default());

    first.resolve(&ids(&["a", "b"]), false).await;
    let mapping = second.resolve(&ids(&["a", "b"]), false).await;

    assert_eq!(source_b.calls(), 0);
    assert!(mapping["a"]);
    assert!(!mapping["b"]);
}

// ─── Timeouts and fail-open ────────────────────────────────────────────────────

/// Fail-open status: a single-entity call that times out still yields a
/// complete mapping, with the timed-out ID mapped to false.
#[tokio::test(start_paused = true)]
async fn hung_call_fails_open_after_call_timeout() {
    let source = MemberSource::with_hung(&["a", "b", "slow"], &["slow"]);
    let resolver = resolver(Arc::clone(&source));

    let mapping = resolver.resolve(&ids(&["a", "b", "slow"]), false).await;

    assert_eq!(mapping.len(), 3);
    assert!(mapping["a"]);
    assert!(mapping["b"]);
    assert!(!mapping["slow"], "timed-out entity must fail open to false");
}

/// The batch deadline cancels still-pending calls even when the per-call
/// timeout would allow them to keep waiting.
#[tokio::test(start_paused = true)]
async fn batch_deadline_cancels_pending_calls() {
    let source = MemberSource::with_hung(&["a", "slow"], &["slow"]);
    let resolver = BatchedStatusResolver::new(
        Arc::clone(&source),
        shared_cache(),
        ResolverConfig {
            call_timeout: Duration::from_secs(60),
            batch_timeout: Duration::from_secs(5),
            ..ResolverConfig::default()
        },
    );

    let started = tokio::time::Instant::now();
    let mapping = resolver.resolve(&ids(&["a", "slow"]), false).await;

    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert!(mapping["a"]);
    assert!(!mapping["slow"]);
}

// ─── Progressive publication ───────────────────────────────────────────────────

/// Partial mappings are published after every batch, so the UI can show
/// early results before the full ID set finishes resolving.
#[tokio::test(start_paused = true)]
async fn partial_results_are_published_per_batch() {
    let names: Vec<String> = (0..12).map(|i| format!("c{i:02}")).collect();
    let member_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let source = MemberSource::new(&member_refs);
    let resolver = Arc::new(resolver(Arc::clone(&source)));

    let mut rx = resolver.subscribe();
    let id_set: HashSet<String> = names.iter().cloned().collect();

    let task = {
        let resolver = Arc::clone(&resolver);
        let id_set = id_set.clone();
        tokio::spawn(async move { resolver.resolve(&id_set, false).await })
    };

    let mut observed: Vec<(usize, bool)> = Vec::new();
    loop {
        rx.changed().await.expect("resolver dropped");
        let snapshot = rx.borrow_and_update().clone();
        observed.push((snapshot.matches.len(), snapshot.complete));
        if snapshot.complete {
            break;
        }
    }
    let mapping: HashMap<String, bool> = task.await.expect("resolve task");

    // First batch of 10 lands before the second batch starts.
    assert!(
        observed.contains(&(10, false)),
        "expected a partial publication of the first batch, saw {observed:?}"
    );
    assert_eq!(observed.last(), Some(&(12, true)));
    assert_eq!(mapping.len(), 12);
    assert!(mapping.values().all(|v| *v));
}

/// Inter-batch delay: two batches are separated by the configured pause.
#[tokio::test(start_paused = true)]
async fn batches_are_separated_by_rate_limit_delay() {
    let names: Vec<String> = (0..12).map(|i| format!("c{i:02}")).collect();
    let member_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let source = MemberSource::new(&member_refs);
    let resolver = resolver(Arc::clone(&source));
    let id_set: HashSet<String> = names.iter().cloned().collect();

    let started = tokio::time::Instant::now();
    resolver.resolve(&id_set, false).await;

    assert_eq!(started.elapsed(), Duration::from_millis(500));
    assert_eq!(source.calls(), 12);
}

/// An empty final result is still a complete result; the engine publishes
/// it rather than overriding anyone's UI toggle.
#[tokio::test(start_paused = true)]
async fn empty_result_is_published_complete() {
    let source = MemberSource::new(&[]);
    let resolver = resolver(Arc::clone(&source));

    let mapping = resolver.resolve(&ids(&["a", "b"]), false).await;
    assert!(mapping.values().all(|v| !*v));

    let snapshot = resolver.subscribe().borrow().clone();
    assert!(snapshot.complete);
    assert!(snapshot.matched_ids().is_empty());
}

/// Decoding failures on individual entities degrade to non-match instead of
/// aborting the resolve.
#[tokio::test(start_paused = true)]
async fn per_entity_errors_do_not_abort_the_resolve() {
    struct HalfBrokenSource;

    #[async_trait]
    impl StatusSource for HalfBrokenSource {
        async fn fetch_status(&self, entity_id: &str) -> FetchResult<bool> {
            if entity_id == "broken" {
                Err(FetchError::decoding("unexpected shape"))
            } else {
                Ok(true)
            }
        }
    }

    let resolver = BatchedStatusResolver::new(
        Arc::new(HalfBrokenSource),
        shared_cache(),
        ResolverConfig::default(),
    );

    let mapping = resolver.resolve(&ids(&["ok", "broken"]), false).await;
    assert!(mapping["ok"]);
    assert!(!mapping["broken"]);
}
