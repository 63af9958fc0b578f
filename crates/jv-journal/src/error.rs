//! Journal access error types.

use thiserror::Error;

/// Errors that can occur while opening or reading a journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("journal not found: {0}")]
    NotFound(String),

    #[error("cursor not found: {0}")]
    CursorNotFound(String),

    #[error("journalctl failed: {0}")]
    Command(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for journal results.
pub type JournalResult<T> = Result<T, JournalError>;
