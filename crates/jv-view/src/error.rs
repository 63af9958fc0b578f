//! View engine error types.

use jv_journal::JournalError;
use thiserror::Error;

/// Rejected filter values. The previous filter value is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("priority {0} is outside 0..=7")]
    PriorityOutOfRange(u8),
}

/// Errors that can occur while driving a journal view.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("view worker error: {0}")]
    Worker(String),

    #[error("view worker has shut down")]
    WorkerClosed,
}

/// Convenience alias for view results.
pub type ViewResult<T> = Result<T, ViewError>;
