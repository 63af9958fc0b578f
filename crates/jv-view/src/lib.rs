//! Windowed journal viewing engine.
//!
//! Presents a sequential-only journal as stable, randomly addressable rows:
//! a `WindowCache` holds a contiguous run of filtered entries and grows at
//! either edge through the `FetchScheduler`. `SearchEngine` and
//! `NearestTimeLocator` reuse the same machinery to extend or re-anchor the
//! window. `JournalView` is the single-owner facade; `ViewHandle` runs it
//! on a worker thread for async callers.

pub mod choices;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod nearest;
pub mod search;
pub mod window;
pub mod worker;

// Re-export key types for convenience
pub use choices::{Category, ChoiceNode, FilterChoiceTree, NodeId};
pub use config::ViewConfig;
pub use error::{FilterError, ViewError, ViewResult};
pub use fetch::{FetchReport, FetchScheduler, SeekOutcome, ViewContext};
pub use filter::{FilterChange, FilterSpec};
pub use model::JournalView;
pub use nearest::NearestTimeLocator;
pub use search::SearchEngine;
pub use window::{Anchor, Boundaries, Edge, RowId, WindowCache};
pub use worker::ViewHandle;
