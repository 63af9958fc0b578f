//! Substring search across the whole filtered stream.
//!
//! The window is scanned first; when it holds no match the window is grown
//! one chunk at a time in the search direction until a match turns up or
//! that edge is exhausted. Rows fetched by an unsuccessful search stay in
//! the window.

use jv_journal::{Direction, LogEntry};

use crate::fetch::{FetchScheduler, ViewContext};
use crate::window::{Edge, WindowCache};

/// Case-sensitive message search driven through a `FetchScheduler`.
pub struct SearchEngine<'s> {
    scheduler: &'s FetchScheduler,
}

fn is_hit(entry: &LogEntry, query: &str) -> bool {
    entry.message.contains(query)
}

impl<'s> SearchEngine<'s> {
    pub fn new(scheduler: &'s FetchScheduler) -> Self {
        Self { scheduler }
    }

    /// Row of the first message containing `query` strictly after
    /// (`Forward`) or strictly before (`Backward`) `start_row`.
    ///
    /// A `start_row` at or past the end of the window searches forward from
    /// the end, or backward from the last row inclusive. Returns `None` for
    /// an empty query, an unpositioned window, an exhausted stream or a
    /// cancelled scan.
    pub fn search(
        &self,
        ctx: &mut ViewContext<'_>,
        query: &str,
        start_row: usize,
        direction: Direction,
    ) -> Option<usize> {
        if query.is_empty() {
            return None;
        }
        if ctx.window.awaiting_fill() {
            let report = self.scheduler.fetch_more(ctx, Edge::Tail);
            if report.cancelled {
                return None;
            }
        }
        if !ctx.window.is_loaded() {
            return None;
        }

        let found = match direction {
            Direction::Forward => self.forward(ctx, query, start_row),
            Direction::Backward => self.backward(ctx, query, start_row),
        };
        tracing::debug!(
            query,
            start_row,
            ?direction,
            found = ?found,
            rows = ctx.window.len(),
            "search finished"
        );
        found
    }

    fn forward(&self, ctx: &mut ViewContext<'_>, query: &str, start_row: usize) -> Option<usize> {
        let mut from_id = ctx.window.row_id(start_row.saturating_add(1));
        loop {
            let window: &WindowCache = ctx.window;
            let from = window.index_of(from_id).unwrap_or(0);
            if let Some(row) = (from..window.len()).find(|&r| {
                window.get(r).is_some_and(|e| is_hit(e, query))
            }) {
                return Some(row);
            }

            from_id = window.row_id(window.len());
            if !self.scheduler.can_fetch_more(window, Edge::Tail) {
                return None;
            }
            if self.scheduler.fetch_more(ctx, Edge::Tail).cancelled {
                return None;
            }
        }
    }

    fn backward(&self, ctx: &mut ViewContext<'_>, query: &str, start_row: usize) -> Option<usize> {
        let mut end_id = ctx.window.row_id(start_row);
        loop {
            let window: &WindowCache = ctx.window;
            let end = window.index_of(end_id).unwrap_or(window.len());
            if let Some(row) = (0..end).rev().find(|&r| {
                window.get(r).is_some_and(|e| is_hit(e, query))
            }) {
                return Some(row);
            }

            end_id = window.row_id(0);
            if !self.scheduler.can_fetch_more(window, Edge::Head) {
                return None;
            }
            if self.scheduler.fetch_more(ctx, Edge::Head).cancelled {
                return None;
            }
        }
    }
}
