//! View engine configuration, loadable from TOML.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a `JournalView`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Matching entries requested per fetch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Source steps between cancellation checks during long scans.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: u64,
    /// Upper bound on materialized rows. `None` keeps every fetched row.
    #[serde(default)]
    pub max_rows: Option<usize>,
}

fn default_chunk_size() -> usize {
    500
}

fn default_checkpoint_interval() -> u64 {
    4096
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            checkpoint_interval: default_checkpoint_interval(),
            max_rows: None,
        }
    }
}
