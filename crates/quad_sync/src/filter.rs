//! Pure filter/sort pipeline applied to a fetched superset before windowing.
//!
//! Predicates split into two groups with a fixed evaluation order:
//!
//! 1. Server-evaluated filters ([`ServerFilters`]) are pass-through. The
//!    rows already match because the server applied them; re-filtering
//!    locally would reintroduce normalization mismatches between client and
//!    server text matching.
//! 2. Locally evaluated predicates: membership-set containment, text search
//!    over a small fixed set of fields, numeric ranges, date ranges, and
//!    category sets.
//!
//! The result is stably sorted by the active sort key with a deterministic
//! identity tie-break so ties never reorder between refreshes. Everything
//! here is deterministic and side-effect-free; collections are bounded to
//! low thousands, so the pipeline is recomputed on demand rather than
//! incrementally maintained.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch::Identified;

/// An entity the local pipeline can evaluate predicates against.
///
/// Every accessor has a default so payload types only implement what their
/// collection actually filters on: a board member has no price, a product
/// has no start date.
pub trait Matchable: Identified {
    /// Fields included in local text search.
    fn search_fields(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Category label, if the entity has one.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Price, for marketplace rows.
    fn price(&self) -> Option<f64> {
        None
    }

    /// Start time, for events and campaigns.
    fn starts_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Creation time, used by the default sort.
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Name used by the alphabetical sort.
    fn display_name(&self) -> &str {
        self.id()
    }
}

/// Sort order applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Alphabetical,
    PriceLowToHigh,
    PriceHighToLow,
}

/// Filters whose source of truth is the server.
///
/// Changing any of these invalidates everything fetched so far: the rows in
/// the superset were selected by the old query, so the collection resets and
/// refetches from offset zero. Serialized by the transport collaborator as
/// query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFilters {
    /// Free-text query evaluated server-side.
    pub query: Option<String>,
    /// Server-side scope, e.g. a campus or community identifier.
    pub scope: Option<String>,
}

/// The full filter/sort configuration for one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    /// Server-evaluated portion; pass-through locally.
    pub server: ServerFilters,
    /// Local case-insensitive text search over [`Matchable::search_fields`].
    pub search_text: Option<String>,
    /// Local category allow-list; empty means all categories.
    pub categories: HashSet<String>,
    /// Keep only entities whose ID is in this set (e.g. "my communities").
    pub member_ids: Option<HashSet<String>>,
    /// Inclusive price bounds.
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Start-time bounds.
    pub starts_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
    /// Active sort order.
    pub sort: SortKey,
}

impl FilterSpec {
    /// Whether switching from `self` to `other` invalidates fetched data.
    ///
    /// True only when the server-evaluated portion changed; local predicate
    /// changes are recomputed over the existing superset.
    #[must_use]
    pub fn requires_reset(&self, other: &FilterSpec) -> bool {
        self.server != other.server
    }

    /// Evaluate the locally-evaluated predicates against one entity.
    pub fn matches<E: Matchable>(&self, entity: &E) -> bool {
        if let Some(member_ids) = &self.member_ids {
            if !member_ids.contains(entity.id()) {
                return false;
            }
        }

        if !self.categories.is_empty() {
            match entity.category() {
                Some(category) if self.categories.contains(category) => {}
                _ => return false,
            }
        }

        if let Some(needle) = &self.search_text {
            let needle = needle.to_lowercase();
            if !needle.is_empty() {
                let hit = entity
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle));
                if !hit {
                    return false;
                }
            }
        }

        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = entity.price() else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min) {
                return false;
            }
            if self.max_price.is_some_and(|max| price > max) {
                return false;
            }
        }

        if self.starts_after.is_some() || self.starts_before.is_some() {
            let Some(starts) = entity.starts_at() else {
                return false;
            };
            if self.starts_after.is_some_and(|after| starts < after) {
                return false;
            }
            if self.starts_before.is_some_and(|before| starts > before) {
                return false;
            }
        }

        true
    }
}

/// Apply the local predicates and sort order to a fetched superset.
///
/// The returned sequence is what the reveal window truncates for display.
pub fn filter_and_sort<E: Matchable + Clone>(items: &[E], spec: &FilterSpec) -> Vec<E> {
    let mut out: Vec<E> = items
        .iter()
        .filter(|entity| spec.matches(*entity))
        .cloned()
        .collect();

    out.sort_by(|a, b| compare(a, b, spec.sort));
    out
}

fn compare<E: Matchable>(a: &E, b: &E, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::Newest => b.created_at().cmp(&a.created_at()),
        SortKey::Oldest => a.created_at().cmp(&b.created_at()),
        SortKey::Alphabetical => a
            .display_name()
            .to_lowercase()
            .cmp(&b.display_name().to_lowercase()),
        SortKey::PriceLowToHigh => a
            .price()
            .partial_cmp(&b.price())
            .unwrap_or(Ordering::Equal),
        SortKey::PriceHighToLow => b
            .price()
            .partial_cmp(&a.price())
            .unwrap_or(Ordering::Equal),
    };

    // Identity descending, so equal keys keep one order across refreshes.
    primary.then_with(|| b.id().cmp(a.id()))
}
