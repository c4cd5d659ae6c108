//! Per-collection synchronization: pagination, reveal windowing, and the
//! controller state machine.
//!
//! # Module Structure
//!
//! - [`cursor`](self) - `PagedCursor`: network pagination position
//! - [`reveal`](self) - `RevealWindow`: visible prefix over the fetched superset
//! - [`state`](self) - `Phase` machine and the observable `CollectionSnapshot`
//! - [`controller`](self) - `CollectionSyncController`: `load()`, `load_more()`,
//!   `refresh()`, `background_refresh()`, `set_filters()`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quad_sync::{CollectionKind, CollectionSyncController, SyncConfig};
//!
//! let controller = Arc::new(CollectionSyncController::new(
//!     CollectionKind::Communities,
//!     Arc::new(transport),
//!     SyncConfig::for_kind(CollectionKind::Communities),
//! ));
//! controller.load().await;
//! ```

mod controller;
mod cursor;
mod reveal;
mod state;
mod types;

pub use controller::CollectionSyncController;
pub use cursor::PagedCursor;
pub use reveal::RevealWindow;
pub use state::{CollectionSnapshot, Phase};
pub use types::{DEFAULT_PAGE_SIZE, DEFAULT_REVEAL_BATCH, SyncConfig};
