//! Jump-to-timestamp.
//!
//! The source is positioned by realtime (a binary search in the source),
//! then scanned outward in rounds: each round reads up to a step budget on
//! the forward side (entries at or after the target) and on the backward
//! side (entries before it), doubling the budget each time. A side stops
//! at its first match, at its end, or once its raw entries are further from
//! the target than the best match found on the other side.

use chrono::{DateTime, TimeDelta, Utc};

use jv_journal::{Cursor, Direction, LogEntry};

use crate::fetch::{FetchScheduler, ScanEnd, ViewContext, seek_after};
use crate::window::{Boundaries, Edge};

/// Raw steps per side in the first round.
const FIRST_ROUND_STEPS: u64 = 32;

/// Locates the filtered entry nearest a timestamp and brings it into the
/// window.
pub struct NearestTimeLocator<'s> {
    scheduler: &'s FetchScheduler,
}

/// One direction of the outward scan.
struct Side {
    direction: Direction,
    /// Last raw entry read on this side; `None` before the first round.
    resume: Option<Cursor>,
    found: Option<LogEntry>,
    done: bool,
}

impl Side {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            resume: None,
            found: None,
            done: false,
        }
    }

    /// Distance from `at` to `entry` on this side of the target.
    fn gap(&self, entry: &LogEntry, at: DateTime<Utc>) -> TimeDelta {
        match self.direction {
            Direction::Forward => entry.realtime - at,
            Direction::Backward => at - entry.realtime,
        }
    }

    /// Whether a raw entry at `gap` could still beat `rival`, the best
    /// match on the other side. Ties go to the entry before the target.
    fn may_win(&self, gap: TimeDelta, rival: Option<TimeDelta>) -> bool {
        rival.is_none_or(|rival| match self.direction {
            Direction::Forward => gap < rival,
            Direction::Backward => gap <= rival,
        })
    }
}

impl<'s> NearestTimeLocator<'s> {
    pub fn new(scheduler: &'s FetchScheduler) -> Self {
        Self { scheduler }
    }

    /// Row of the matching entry nearest `at`; ties go to the entry at or
    /// before `at`. `None` when no entry passes the filter, or when the
    /// lookup is cancelled or fails.
    ///
    /// If the entry lies outside the window, the window is reset to that
    /// single row with both edges open for fetching.
    pub fn closest_index_for_data(
        &self,
        ctx: &mut ViewContext<'_>,
        at: DateTime<Utc>,
    ) -> Option<usize> {
        if ctx.window.is_loaded()
            && let Some(row) = ctx.window.closest_row(at)
        {
            return Some(row);
        }

        let chosen = match self.locate(ctx, at) {
            Ok(chosen) => chosen?,
            Err(reason) => {
                tracing::warn!(%at, reason, "nearest-time lookup abandoned");
                return None;
            }
        };

        if ctx.window.is_loaded()
            && let Some(row) = ctx.window.row_of_cursor(&chosen.cursor)
        {
            return Some(row);
        }

        tracing::debug!(%at, cursor = %chosen.cursor, "re-anchoring window for jump");
        ctx.window.position(
            None,
            Boundaries {
                more_at_head: true,
                more_at_tail: true,
            },
        );
        ctx.window.extend(Edge::Tail, vec![chosen]);
        Some(0)
    }

    /// Find the nearest matching entry without touching the window.
    fn locate(
        &self,
        ctx: &mut ViewContext<'_>,
        at: DateTime<Utc>,
    ) -> Result<Option<LogEntry>, &'static str> {
        let mut after = Side::new(Direction::Forward);
        let mut before = Side::new(Direction::Backward);
        let mut budget = FIRST_ROUND_STEPS;

        while !(after.done && before.done) {
            let rival = before.found.as_ref().map(|e| before.gap(e, at));
            self.expand(ctx, at, &mut after, rival, budget)?;
            let rival = after.found.as_ref().map(|e| after.gap(e, at));
            self.expand(ctx, at, &mut before, rival, budget)?;
            budget = budget.saturating_mul(2);
        }

        Ok(match (before.found, after.found) {
            (Some(b), Some(a)) => {
                if at - b.realtime <= a.realtime - at {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        })
    }

    /// Read up to `budget` raw entries on `side`, continuing where the
    /// previous round stopped.
    fn expand(
        &self,
        ctx: &mut ViewContext<'_>,
        at: DateTime<Utc>,
        side: &mut Side,
        rival: Option<TimeDelta>,
        budget: u64,
    ) -> Result<(), &'static str> {
        if side.done {
            return Ok(());
        }
        let positioned = match (&side.resume, side.direction) {
            (None, _) => ctx.source.seek_realtime(at),
            (Some(cursor), Direction::Forward) => seek_after(ctx.source, cursor),
            (Some(cursor), Direction::Backward) => ctx.source.seek_cursor(cursor),
        };
        positioned.map_err(|_| "journal seek failed")?;

        let mut steps = 0;
        let mut over_budget = false;
        let mut last = None;
        let outcome = self.scheduler.scan(ctx, side.direction, 1, |entry| {
            steps += 1;
            if steps > budget {
                over_budget = true;
                return false;
            }
            if !side.may_win(side.gap(entry, at), rival) {
                return false;
            }
            last = Some(entry.cursor.clone());
            true
        });

        match outcome.end {
            ScanEnd::Failed(_) => return Err("journal read failed"),
            ScanEnd::Cancelled => return Err("cancelled"),
            ScanEnd::Bounded if over_budget => {
                if last.is_some() {
                    side.resume = last;
                }
            }
            ScanEnd::Limit | ScanEnd::Exhausted | ScanEnd::Bounded => side.done = true,
        }
        side.found = side.found.take().or(outcome.matches.into_iter().next());
        tracing::trace!(
            direction = ?side.direction,
            scanned = outcome.scanned,
            done = side.done,
            "nearest-time round"
        );
        Ok(())
    }
}
