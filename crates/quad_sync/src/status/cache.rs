//! The status cache shared by every consumer of membership lookups.
//!
//! Originally a process-wide mutable singleton; here it is an explicitly
//! constructed instance with a documented invalidation contract: the cache
//! answers only when the caller's ID set matches the one it was computed
//! over *exactly* and the whole-cache stamp is younger than the TTL.
//! Entries are overwritten by resolver runs and superseded by newer full
//! resolves, never deleted individually.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

/// How long a full resolve stays fresh.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(300);

/// One resolved status value.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    /// The resolved status.
    pub value: bool,
    /// When this entry was resolved.
    pub resolved_at: Instant,
}

/// Mapping from entity ID to resolved status, with whole-cache freshness.
#[derive(Debug)]
pub struct StatusCache {
    entries: HashMap<String, StatusEntry>,
    /// The exact ID set the last full resolve was computed over.
    id_set: HashSet<String>,
    last_full_resolve_at: Option<Instant>,
    ttl: Duration,
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TTL)
    }
}

impl StatusCache {
    /// Create an empty cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            id_set: HashSet::new(),
            last_full_resolve_at: None,
            ttl,
        }
    }

    /// The configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the cache can answer for this exact ID set without network.
    #[must_use]
    pub fn is_fresh_for(&self, ids: &HashSet<String>) -> bool {
        match self.last_full_resolve_at {
            Some(at) => self.id_set == *ids && at.elapsed() < self.ttl,
            None => false,
        }
    }

    /// The cached mapping over the last fully resolved ID set.
    ///
    /// IDs the resolver never answered for map to `false` (fail-open).
    #[must_use]
    pub fn mapping(&self) -> HashMap<String, bool> {
        self.id_set
            .iter()
            .map(|id| {
                let value = self.entries.get(id).map(|e| e.value).unwrap_or(false);
                (id.clone(), value)
            })
            .collect()
    }

    /// IDs whose cached status is `true`, e.g. for a membership filter.
    #[must_use]
    pub fn matched_ids(&self) -> HashSet<String> {
        self.id_set
            .iter()
            .filter(|id| self.entries.get(*id).is_some_and(|e| e.value))
            .cloned()
            .collect()
    }

    /// Record one resolved status, overwriting any previous entry.
    pub fn record(&mut self, id: &str, value: bool) {
        self.entries.insert(
            id.to_string(),
            StatusEntry {
                value,
                resolved_at: Instant::now(),
            },
        );
    }

    /// Stamp a completed full resolve over `ids`.
    pub fn complete_full_resolve(&mut self, ids: &HashSet<String>) {
        self.id_set = ids.clone();
        self.last_full_resolve_at = Some(Instant::now());
    }
}
