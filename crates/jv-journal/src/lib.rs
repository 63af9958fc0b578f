//! Journal access for the journal viewer.
//!
//! Provides the `JournalSource` abstraction (sequential, cursor-addressable
//! reading with seek-to-head/tail/cursor/realtime), a reader for the systemd
//! journal export format, an in-memory journal for tests, and boot listing.

pub mod boots;
pub mod error;
pub mod export;
pub mod journal;
pub mod memory;
pub mod source;
pub mod types;

// Re-export key types for convenience
pub use boots::{BootInfo, list_boots};
pub use error::{JournalError, JournalResult};
pub use journal::{ExportJournal, JournalOrigin};
pub use memory::{EntryBuilder, JournalTap, MemoryJournal};
pub use source::{JournalSource, Step};
pub use types::{Cursor, Direction, Field, LogEntry, Priority};
