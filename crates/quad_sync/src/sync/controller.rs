//! The per-collection sync controller.
//!
//! Composes the paged cursor, reveal window, filter pipeline, and retry
//! policy into one state machine per tracked collection. All six collection
//! screens (communities, events, campaigns, products, members, board
//! members) are instantiations of this one type.
//!
//! Interior state lives behind a `std::sync::Mutex` that is only held
//! across synchronous sections, never across an await: every network result
//! is buffered locally and applied under one short lock, guarded by a
//! monotonically increasing epoch token so a result that arrives after a
//! refresh has reset the collection is discarded instead of applied.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::fetch::{CollectionKind, FetchError, Identified, Page, PageSource, Result};
use crate::filter::{FilterSpec, filter_and_sort};
use crate::retry::{RetryConfig, with_retry};

use super::cursor::PagedCursor;
use super::reveal::RevealWindow;
use super::state::{CollectionSnapshot, Phase};
use super::types::SyncConfig;

struct Inner<E> {
    /// Every item fetched so far under the current server filters, in fetch
    /// order, deduplicated by identity.
    superset: Vec<E>,
    /// Identities present in `superset`.
    seen: HashSet<String>,
    cursor: PagedCursor,
    reveal: RevealWindow,
    filters: FilterSpec,
    phase: Phase,
    /// Bumped on every reload/reset; stale in-flight results compare against
    /// it at apply time and are dropped.
    epoch: u64,
    has_loaded_once: bool,
    last_error: Option<String>,
}

/// Orchestrates fetch, buffer, reveal, and refresh for one collection.
///
/// Methods take `&self` and may be called from concurrent tasks; the phase
/// machine guarantees at most one in-flight primary operation per
/// collection, and overlapping requests are dropped rather than queued.
pub struct CollectionSyncController<S: PageSource> {
    kind: CollectionKind,
    source: Arc<S>,
    config: SyncConfig,
    inner: Mutex<Inner<S::Entity>>,
    tx: watch::Sender<CollectionSnapshot<S::Entity>>,
}

impl<S: PageSource> CollectionSyncController<S> {
    /// Create a controller for one collection.
    pub fn new(kind: CollectionKind, source: Arc<S>, config: SyncConfig) -> Self {
        let inner = Inner {
            superset: Vec::new(),
            seen: HashSet::new(),
            cursor: PagedCursor::new(config.page_size),
            reveal: RevealWindow::new(config.reveal_batch),
            filters: FilterSpec::default(),
            phase: Phase::Idle,
            epoch: 0,
            has_loaded_once: false,
            last_error: None,
        };
        let (tx, _rx) = watch::channel(CollectionSnapshot::default());

        Self {
            kind,
            source,
            config,
            inner: Mutex::new(inner),
            tx,
        }
    }

    /// The collection this controller tracks.
    #[must_use]
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Subscribe to state updates. Every transition publishes one snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CollectionSnapshot<S::Entity>> {
        self.tx.subscribe()
    }

    /// The most recently published state.
    #[must_use]
    pub fn snapshot(&self) -> CollectionSnapshot<S::Entity> {
        self.tx.borrow().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S::Entity>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, inner: &Inner<S::Entity>) {
        let filtered = filter_and_sort(&inner.superset, &inner.filters);
        let visible = inner.reveal.revealed().min(filtered.len());

        self.tx.send_replace(CollectionSnapshot {
            items: filtered[..visible].to_vec(),
            is_loading: inner.phase == Phase::LoadingFirst,
            is_loading_more: inner.phase == Phase::LoadingMore,
            is_refreshing: matches!(inner.phase, Phase::Refreshing { silent: false }),
            has_loaded_once: inner.has_loaded_once,
            error: inner.last_error.clone(),
        });
    }

    /// First population of the collection.
    ///
    /// No-op if data is already loaded or a primary operation is in flight.
    /// Runs under the first-load retry policy, since a cold start failing
    /// silently would show a dead screen.
    pub async fn load(&self) {
        let (epoch, server) = {
            let mut inner = self.lock();
            if inner.phase.is_busy() {
                return;
            }
            if inner.has_loaded_once && !inner.superset.is_empty() {
                return;
            }
            inner.epoch += 1;
            inner.phase = Phase::LoadingFirst;
            inner.last_error = None;
            self.publish(&inner);
            (inner.epoch, inner.filters.server.clone())
        };

        let result = with_retry(
            || self.source.fetch_page(self.kind, &server, 0, self.config.page_size),
            &self.config.first_load_retry,
        )
        .await;

        self.apply_reload(epoch, result);
    }

    /// Full reload, keeping previously displayed data on screen until the
    /// fresh page is ready. Concurrent refreshes are dropped, not queued.
    pub async fn refresh(&self) {
        self.reload(false).await;
    }

    /// Reload used when the app returns to foreground: a no-op unless the
    /// collection already completed its first load, and never surfaces a
    /// loading indicator or an error, regardless of outcome.
    pub async fn background_refresh(&self) {
        self.reload(true).await;
    }

    async fn reload(&self, silent: bool) {
        let (epoch, server) = {
            let mut inner = self.lock();
            if matches!(inner.phase, Phase::Refreshing { .. } | Phase::LoadingFirst) {
                return;
            }
            if silent && !inner.has_loaded_once {
                return;
            }
            // A load_more may still be in flight; bumping the epoch makes
            // its result stale at apply time, so this refresh wins.
            inner.epoch += 1;
            inner.phase = if inner.has_loaded_once {
                Phase::Refreshing { silent }
            } else {
                // Nothing to display yet, so this behaves as a first load.
                Phase::LoadingFirst
            };
            self.publish(&inner);
            (inner.epoch, inner.filters.server.clone())
        };

        // User-initiated refreshes run a single attempt to keep interactive
        // latency predictable.
        let result = with_retry(
            || self.source.fetch_page(self.kind, &server, 0, self.config.page_size),
            &RetryConfig::single_attempt(),
        )
        .await;

        self.apply_reload(epoch, result);
    }

    /// Apply a page-zero result: replace superset, cursor, and reveal window
    /// as a single observable transition.
    fn apply_reload(&self, epoch: u64, result: Result<Page<S::Entity>>) {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            tracing::debug!(kind = self.kind.as_str(), "discarding stale reload result");
            return;
        }

        match result {
            Ok(page) => {
                let returned = page.items.len();
                self.check_hint(&page, returned);

                let mut seen = HashSet::with_capacity(returned);
                let mut superset = Vec::with_capacity(returned);
                for item in page.items {
                    if seen.insert(item.id().to_string()) {
                        superset.push(item);
                    }
                }

                inner.superset = superset;
                inner.seen = seen;
                inner.cursor.reset();
                inner.cursor.advance(returned);

                let filtered_len = filter_and_sort(&inner.superset, &inner.filters).len();
                inner
                    .reveal
                    .reset_to_first_page(filtered_len, self.config.page_size);

                inner.phase = Phase::Loaded;
                inner.has_loaded_once = true;
                inner.last_error = None;
                self.publish(&inner);
            }
            Err(FetchError::Cancelled) => {
                // The caller no longer wants the result; leave everything
                // exactly as it was before the call started.
                inner.phase = self.settled_phase(&inner);
                self.publish(&inner);
            }
            Err(err) => {
                if inner.has_loaded_once {
                    // Silent-refresh-failure policy: a refresh failing must
                    // never regress a working screen to an error screen.
                    tracing::debug!(
                        kind = self.kind.as_str(),
                        error = %err,
                        "refresh failed, keeping previous data"
                    );
                    inner.phase = Phase::Loaded;
                } else {
                    inner.phase = Phase::Error;
                    inner.last_error = Some(err.to_string());
                }
                self.publish(&inner);
            }
        }
    }

    /// Where the phase settles after a cancelled primary operation.
    fn settled_phase(&self, inner: &Inner<S::Entity>) -> Phase {
        if inner.has_loaded_once {
            Phase::Loaded
        } else if inner.last_error.is_some() {
            Phase::Error
        } else {
            Phase::Idle
        }
    }

    /// Reveal more items in response to a "scrolled near bottom" event.
    ///
    /// Grows the window over already-buffered data without any network call
    /// when possible; only once local data is exhausted does it fetch the
    /// next page. Suppressed entirely while a refresh or first load is in
    /// flight, and while another lazy load is already running.
    pub async fn load_more(&self) {
        let (epoch, offset, server) = {
            let mut inner = self.lock();
            if inner.phase != Phase::Loaded {
                return;
            }

            let filtered_len = filter_and_sort(&inner.superset, &inner.filters).len();
            if !inner
                .reveal
                .needs_more(filtered_len, inner.cursor.has_more_remote())
            {
                return;
            }

            if inner.reveal.revealed() < filtered_len {
                // Local data still buffered; widen the window and return
                // without touching the network.
                inner.reveal.grow(filtered_len);
                self.publish(&inner);
                return;
            }

            inner.phase = Phase::LoadingMore;
            self.publish(&inner);
            (
                inner.epoch,
                inner.cursor.offset(),
                inner.filters.server.clone(),
            )
        };

        let result = self
            .source
            .fetch_page(self.kind, &server, offset, self.config.page_size)
            .await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            // A refresh reset the collection while this page was in flight;
            // the refresh owns the phase now.
            tracing::debug!(kind = self.kind.as_str(), "discarding stale load-more result");
            return;
        }

        match result {
            Ok(page) => {
                let returned = page.items.len();
                self.check_hint(&page, returned);

                for item in page.items {
                    if inner.seen.insert(item.id().to_string()) {
                        inner.superset.push(item);
                    }
                }
                inner.cursor.advance(returned);

                let filtered_len = filter_and_sort(&inner.superset, &inner.filters).len();
                inner.reveal.grow(filtered_len);

                inner.phase = Phase::Loaded;
                self.publish(&inner);
            }
            Err(err) => {
                if !err.is_cancelled() {
                    tracing::debug!(
                        kind = self.kind.as_str(),
                        error = %err,
                        "load-more failed, keeping revealed data"
                    );
                }
                inner.phase = Phase::Loaded;
                self.publish(&inner);
            }
        }
    }

    /// Replace the filter/sort configuration.
    ///
    /// A change to the server-evaluated portion invalidates everything
    /// fetched so far and triggers a full reset plus reload; a local-only
    /// change recomputes the pipeline over the existing superset and
    /// re-derives the reveal window.
    pub async fn set_filters(&self, filters: FilterSpec) {
        let needs_reset = {
            let mut inner = self.lock();
            if inner.filters == filters {
                return;
            }
            let needs_reset = inner.filters.requires_reset(&filters);
            inner.filters = filters;

            if needs_reset {
                // Invalidate any in-flight result fetched under old filters.
                inner.epoch += 1;
                inner.superset.clear();
                inner.seen.clear();
                inner.cursor.reset();
                inner.reveal.clamp(0);
                inner.has_loaded_once = false;
                inner.last_error = None;
                inner.phase = Phase::Idle;
            } else {
                let filtered_len = filter_and_sort(&inner.superset, &inner.filters).len();
                inner
                    .reveal
                    .reset_to_first_page(filtered_len, self.config.page_size);
            }
            self.publish(&inner);
            needs_reset
        };

        if needs_reset {
            self.load().await;
        }
    }

    fn check_hint(&self, page: &Page<S::Entity>, returned: usize) {
        if let Some(hint) = page.has_more_hint {
            let short_page = returned < self.config.page_size;
            if hint == short_page {
                // The short-page signal is authoritative; note the
                // disagreement and move on.
                tracing::debug!(
                    kind = self.kind.as_str(),
                    returned,
                    hint,
                    "ignoring inconsistent has-more hint"
                );
            }
        }
    }
}
