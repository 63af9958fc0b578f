//! Journal source abstraction: sequential, cursor-addressable reading.

use chrono::{DateTime, Utc};

use crate::error::JournalResult;
use crate::types::{Cursor, Direction, Field, LogEntry};

/// Outcome of a single step through the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The step moved onto this entry.
    Entry(LogEntry),
    /// The read position is already at the boundary in that direction.
    End,
}

/// Sequential reader over an append-only, timestamp-ordered journal.
///
/// The read position always sits in a gap between two entries. Seeks move
/// the gap; `next` returns the entry after the gap and moves past it,
/// `previous` returns the entry before the gap and moves before it.
///
/// Implementations are not safe for concurrent cursor use: only one read
/// operation may be active at a time, which `&mut self` enforces.
pub trait JournalSource: Send {
    /// Whether the journal was opened successfully.
    fn is_valid(&self) -> bool;

    /// Boot id of the running system, if known.
    fn current_boot_id(&self) -> Option<String>;

    /// Distinct values of `field` across the whole journal.
    fn query_unique(&mut self, field: Field) -> JournalResult<Vec<String>>;

    /// Position before the first entry.
    fn seek_head(&mut self) -> JournalResult<()>;

    /// Position after the last entry.
    fn seek_tail(&mut self) -> JournalResult<()>;

    /// Position immediately before the entry identified by `cursor`.
    fn seek_cursor(&mut self, cursor: &Cursor) -> JournalResult<()>;

    /// Position before the first entry whose realtime is `>= at`.
    fn seek_realtime(&mut self, at: DateTime<Utc>) -> JournalResult<()>;

    /// Step onto the next (newer) entry.
    fn next(&mut self) -> JournalResult<Step>;

    /// Step onto the previous (older) entry.
    fn previous(&mut self) -> JournalResult<Step>;

    /// Step in `direction`.
    fn step(&mut self, direction: Direction) -> JournalResult<Step> {
        match direction {
            Direction::Forward => self.next(),
            Direction::Backward => self.previous(),
        }
    }
}
