//! Materialized window of filtered entries with stable row addressing.
//!
//! Rows live in a `VecDeque` so both edges grow in amortized O(1). Each row
//! also has a `RowId`: the window keeps an integer base (the id of row 0)
//! that drops by `k` whenever `k` rows are prepended, so ids stay stable
//! while virtual row indices shift.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use jv_journal::{Cursor, Direction, LogEntry};

/// One end of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Older entries, row 0 side.
    Head,
    /// Newer entries, last row side.
    Tail,
}

impl Edge {
    /// Direction the journal is read in to grow this edge.
    pub fn direction(self) -> Direction {
        match self {
            Self::Head => Direction::Backward,
            Self::Tail => Direction::Forward,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Head => Self::Tail,
            Self::Tail => Self::Head,
        }
    }
}

/// Stable identity of a materialized row, independent of head growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(i64);

/// Per-edge "more matching entries may exist beyond the window" flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boundaries {
    pub more_at_head: bool,
    pub more_at_tail: bool,
}

/// Position the next (initial) fill reads from, set by a seek.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// First matching entry to load; included in the fill.
    pub cursor: Cursor,
    /// Direction the fill reads in from the anchor.
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Never seeked, or invalidated by a filter/source change.
    Empty,
    /// Seeked for the current filter; rows may still be empty.
    Loaded,
}

/// Contiguous, filtered run of journal entries.
#[derive(Debug)]
pub struct WindowCache {
    rows: VecDeque<LogEntry>,
    base: i64,
    boundaries: Boundaries,
    anchor: Option<Anchor>,
    state: State,
}

impl Default for WindowCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowCache {
    pub fn new() -> Self {
        Self {
            rows: VecDeque::new(),
            base: 0,
            boundaries: Boundaries::default(),
            anchor: None,
            state: State::Empty,
        }
    }

    /// Drop every row and forget the position.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.base = 0;
        self.boundaries = Boundaries::default();
        self.anchor = None;
        self.state = State::Empty;
    }

    /// Reset to a freshly seeked, still unfilled window.
    pub fn position(&mut self, anchor: Option<Anchor>, boundaries: Boundaries) {
        self.clear();
        self.anchor = anchor;
        self.boundaries = boundaries;
        self.state = State::Loaded;
    }

    pub fn is_loaded(&self) -> bool {
        self.state == State::Loaded
    }

    /// Seeked, with a non-empty filtered stream, but nothing fetched yet.
    pub fn awaiting_fill(&self) -> bool {
        self.is_loaded() && self.rows.is_empty() && self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    pub fn take_anchor(&mut self) -> Option<Anchor> {
        self.anchor.take()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&LogEntry> {
        self.rows.get(row)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.rows.iter()
    }

    pub fn first(&self) -> Option<&LogEntry> {
        self.rows.front()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.rows.back()
    }

    /// Entry at the given edge.
    pub fn edge_entry(&self, edge: Edge) -> Option<&LogEntry> {
        match edge {
            Edge::Head => self.first(),
            Edge::Tail => self.last(),
        }
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    pub fn more(&self, edge: Edge) -> bool {
        match edge {
            Edge::Head => self.boundaries.more_at_head,
            Edge::Tail => self.boundaries.more_at_tail,
        }
    }

    pub fn set_more(&mut self, edge: Edge, more: bool) {
        match edge {
            Edge::Head => self.boundaries.more_at_head = more,
            Edge::Tail => self.boundaries.more_at_tail = more,
        }
    }

    /// Add entries at `edge`. Entries are given in reading order: nearest
    /// to the window first, so head entries arrive newest-to-oldest.
    pub fn extend(&mut self, edge: Edge, entries: Vec<LogEntry>) {
        match edge {
            Edge::Head => {
                self.base -= entries.len() as i64;
                for entry in entries {
                    self.rows.push_front(entry);
                }
            }
            Edge::Tail => self.rows.extend(entries),
        }
    }

    /// Remove up to `count` rows from `edge`; more entries now exist there.
    pub fn evict(&mut self, edge: Edge, count: usize) -> usize {
        let count = count.min(self.rows.len());
        match edge {
            Edge::Head => {
                self.rows.drain(..count);
                self.base += count as i64;
            }
            Edge::Tail => {
                self.rows.truncate(self.rows.len() - count);
            }
        }
        if count > 0 {
            self.set_more(edge, true);
        }
        count
    }

    /// Stable id of `row`, or of the position one past the last row.
    pub fn row_id(&self, row: usize) -> RowId {
        RowId(self.base + row.min(self.rows.len()) as i64)
    }

    /// Current index of `id`. The one-past-the-end id maps to `len()`;
    /// evicted or never-loaded ids map to `None`.
    pub fn index_of(&self, id: RowId) -> Option<usize> {
        let offset = id.0 - self.base;
        if offset < 0 || offset > self.rows.len() as i64 {
            return None;
        }
        Some(offset as usize)
    }

    pub fn row_of_cursor(&self, cursor: &Cursor) -> Option<usize> {
        self.rows.iter().position(|e| &e.cursor == cursor)
    }

    /// Nearest row to `at` when the window alone can answer: `at` lies
    /// within the materialized time span, or beyond an exhausted edge.
    /// Ties go to the row at or before `at`.
    pub fn closest_row(&self, at: DateTime<Utc>) -> Option<usize> {
        let first = self.rows.front()?;
        let last = self.rows.back()?;
        if at < first.realtime {
            return (!self.boundaries.more_at_head).then_some(0);
        }
        if at > last.realtime {
            return (!self.boundaries.more_at_tail).then_some(self.rows.len() - 1);
        }

        let after = self.rows.partition_point(|e| e.realtime <= at);
        if after == 0 {
            return Some(0);
        }
        if after == self.rows.len() {
            return Some(after - 1);
        }
        let before_gap = at - self.rows[after - 1].realtime;
        let after_gap = self.rows[after].realtime - at;
        Some(if after_gap < before_gap { after } else { after - 1 })
    }
}
