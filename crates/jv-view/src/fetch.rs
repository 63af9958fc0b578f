//! Fetch scheduling: seeks and window growth by scanning the journal.
//!
//! Every fetch re-seeks the source from the cursor at the window edge, so
//! the source may be used for other reads (search, boot listing) in
//! between. Non-matching entries are stepped over without counting against
//! the chunk; a sparse filter can make one fetch scan the whole journal.

use jv_journal::{Cursor, Direction, JournalError, JournalResult, JournalSource, LogEntry, Step};
use tokio_util::sync::CancellationToken;

use crate::config::ViewConfig;
use crate::filter::FilterSpec;
use crate::window::{Anchor, Boundaries, Edge, WindowCache};

/// Borrowed engine state for one operation.
pub struct ViewContext<'a> {
    pub source: &'a mut dyn JournalSource,
    pub filter: &'a FilterSpec,
    pub window: &'a mut WindowCache,
    /// Token for this operation only, usually a child of the view's token.
    pub cancel: CancellationToken,
}

// ── Scanning ──────────────────────────────────────────────────

/// Why a scan stopped.
#[derive(Debug)]
pub(crate) enum ScanEnd {
    /// Collected the requested number of matches.
    Limit,
    /// The source reached its natural end in the scan direction.
    Exhausted,
    /// The caller's bound rejected a raw entry.
    Bounded,
    Cancelled,
    Failed(JournalError),
}

#[derive(Debug)]
pub(crate) struct ScanOutcome {
    /// Matching entries in reading order.
    pub matches: Vec<LogEntry>,
    pub scanned: u64,
    pub end: ScanEnd,
}

/// Step from the source's current position in `direction`, collecting up
/// to `limit` entries that pass `filter`. `within` sees every raw entry
/// before filtering and stops the scan by returning false.
pub(crate) fn scan(
    source: &mut dyn JournalSource,
    filter: &FilterSpec,
    cancel: &CancellationToken,
    checkpoint_interval: u64,
    direction: Direction,
    limit: usize,
    mut within: impl FnMut(&LogEntry) -> bool,
) -> ScanOutcome {
    let mut matches = Vec::new();
    let mut scanned: u64 = 0;
    let checkpoint = checkpoint_interval.max(1);

    let end = loop {
        if matches.len() >= limit {
            break ScanEnd::Limit;
        }
        if scanned > 0 && scanned % checkpoint == 0 && cancel.is_cancelled() {
            break ScanEnd::Cancelled;
        }
        let entry = match source.step(direction) {
            Ok(Step::Entry(entry)) => entry,
            Ok(Step::End) => break ScanEnd::Exhausted,
            Err(e) => break ScanEnd::Failed(e),
        };
        scanned += 1;
        if !within(&entry) {
            break ScanEnd::Bounded;
        }
        if filter.matches(&entry) {
            matches.push(entry);
        }
    };

    ScanOutcome {
        matches,
        scanned,
        end,
    }
}

/// Mark `edge` exhausted after a read failure. A window that never got its
/// first rows has nothing to grow from, so both edges end.
fn abandon_edge(window: &mut WindowCache, edge: Edge) {
    window.take_anchor();
    window.set_more(edge, false);
    if window.is_empty() {
        window.set_more(edge.opposite(), false);
    }
}

/// Move the read position to just after the entry at `cursor`.
pub(crate) fn seek_after(source: &mut dyn JournalSource, cursor: &Cursor) -> JournalResult<()> {
    source.seek_cursor(cursor)?;
    match source.next()? {
        Step::Entry(entry) if &entry.cursor == cursor => Ok(()),
        _ => Err(JournalError::CursorNotFound(cursor.to_string())),
    }
}

// ── Reports ───────────────────────────────────────────────────

/// What a single fetch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Matching entries added to the window.
    pub appended: usize,
    /// Raw source entries stepped over, matching or not.
    pub scanned: u64,
    /// Rows dropped from the opposite edge to honour `max_rows`.
    pub evicted: usize,
    /// The source ran out in the fetch direction.
    pub exhausted: bool,
    pub cancelled: bool,
    /// A source read failed; the edge is now treated as exhausted.
    pub failed: bool,
}

/// Result of positioning the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Positioned at a matching entry.
    Positioned,
    /// No entry passes the filter.
    EmptyStream,
    /// Cancelled before a matching entry was found; window untouched.
    Cancelled,
}

// ── Scheduler ─────────────────────────────────────────────────

/// Grows the window at either edge in chunks of matching entries.
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    chunk_size: usize,
    checkpoint_interval: u64,
    max_rows: Option<usize>,
}

impl Default for FetchScheduler {
    fn default() -> Self {
        Self::from_config(&ViewConfig::default())
    }
}

impl FetchScheduler {
    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            checkpoint_interval: config.checkpoint_interval.max(1),
            max_rows: config.max_rows,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Applies to future fetches only. Zero is ignored.
    pub fn set_chunk_size(&mut self, size: usize) {
        if size == 0 {
            tracing::warn!("ignoring zero fetch chunk size");
            return;
        }
        self.chunk_size = size;
    }

    pub fn checkpoint_interval(&self) -> u64 {
        self.checkpoint_interval
    }

    pub(crate) fn scan(
        &self,
        ctx: &mut ViewContext<'_>,
        direction: Direction,
        limit: usize,
        within: impl FnMut(&LogEntry) -> bool,
    ) -> ScanOutcome {
        scan(
            ctx.source,
            ctx.filter,
            &ctx.cancel,
            self.checkpoint_interval,
            direction,
            limit,
            within,
        )
    }

    /// Reset the window to the first (`Edge::Head`) or last (`Edge::Tail`)
    /// matching entry. On error or cancellation the window is untouched.
    pub fn seek(&self, ctx: &mut ViewContext<'_>, edge: Edge) -> JournalResult<SeekOutcome> {
        let direction = match edge {
            Edge::Head => {
                ctx.source.seek_head()?;
                Direction::Forward
            }
            Edge::Tail => {
                ctx.source.seek_tail()?;
                Direction::Backward
            }
        };

        let outcome = self.scan(ctx, direction, 1, |_| true);
        let found = match outcome.end {
            ScanEnd::Failed(e) => return Err(e),
            ScanEnd::Cancelled => return Ok(SeekOutcome::Cancelled),
            _ => outcome.matches.into_iter().next(),
        };

        let Some(first) = found else {
            tracing::debug!(?edge, scanned = outcome.scanned, "filtered stream is empty");
            ctx.window.position(None, Boundaries::default());
            return Ok(SeekOutcome::EmptyStream);
        };

        let boundaries = match edge {
            Edge::Head => Boundaries {
                more_at_head: false,
                more_at_tail: true,
            },
            Edge::Tail => Boundaries {
                more_at_head: true,
                more_at_tail: false,
            },
        };
        tracing::debug!(?edge, cursor = %first.cursor, scanned = outcome.scanned, "window positioned");
        ctx.window.position(
            Some(Anchor {
                cursor: first.cursor,
                direction,
            }),
            boundaries,
        );
        Ok(SeekOutcome::Positioned)
    }

    /// Reset the window at the matching entry nearest `cursor`: the entry
    /// itself or the first match after it, else the last match before it.
    pub fn seek_cursor(
        &self,
        ctx: &mut ViewContext<'_>,
        cursor: &Cursor,
    ) -> JournalResult<SeekOutcome> {
        ctx.source.seek_cursor(cursor)?;
        let forward = self.scan(ctx, Direction::Forward, 1, |_| true);
        let found = match forward.end {
            ScanEnd::Failed(e) => return Err(e),
            ScanEnd::Cancelled => return Ok(SeekOutcome::Cancelled),
            _ => forward.matches.into_iter().next(),
        };
        if let Some(entry) = found {
            self.reposition(ctx.window, entry.cursor);
            return Ok(SeekOutcome::Positioned);
        }

        ctx.source.seek_cursor(cursor)?;
        let backward = self.scan(ctx, Direction::Backward, 1, |_| true);
        let found = match backward.end {
            ScanEnd::Failed(e) => return Err(e),
            ScanEnd::Cancelled => return Ok(SeekOutcome::Cancelled),
            _ => backward.matches.into_iter().next(),
        };
        match found {
            Some(entry) => {
                // Nothing matches after the cursor, so this entry is the last.
                ctx.window.position(
                    Some(Anchor {
                        cursor: entry.cursor,
                        direction: Direction::Backward,
                    }),
                    Boundaries {
                        more_at_head: true,
                        more_at_tail: false,
                    },
                );
                Ok(SeekOutcome::Positioned)
            }
            None => {
                ctx.window.position(None, Boundaries::default());
                Ok(SeekOutcome::EmptyStream)
            }
        }
    }

    /// Position the window at a known matching entry, to be filled forward.
    pub(crate) fn reposition(&self, window: &mut WindowCache, cursor: Cursor) {
        window.position(
            Some(Anchor {
                cursor,
                direction: Direction::Forward,
            }),
            Boundaries {
                more_at_head: true,
                more_at_tail: true,
            },
        );
    }

    /// True iff a fetch at `edge` could still add rows.
    pub fn can_fetch_more(&self, window: &WindowCache, edge: Edge) -> bool {
        window.awaiting_fill() || (window.is_loaded() && window.more(edge))
    }

    /// Fetch with the configured chunk size.
    pub fn fetch_more(&self, ctx: &mut ViewContext<'_>, edge: Edge) -> FetchReport {
        self.fetch_chunk(ctx, edge, self.chunk_size)
    }

    /// Collect up to `chunk` matching entries beyond `edge`.
    ///
    /// The first fetch after a seek reads from the seek anchor in its
    /// natural direction, whichever edge is requested. A read failure
    /// discards the partial chunk and marks the edge exhausted.
    pub fn fetch_chunk(&self, ctx: &mut ViewContext<'_>, edge: Edge, chunk: usize) -> FetchReport {
        if !self.can_fetch_more(ctx.window, edge) || chunk == 0 {
            return FetchReport::default();
        }

        let (edge, direction, positioned) = match ctx.window.anchor().cloned() {
            Some(anchor) if ctx.window.is_empty() => {
                // Land next to the anchor so the scan includes it.
                let positioned = match anchor.direction {
                    Direction::Forward => ctx.source.seek_cursor(&anchor.cursor),
                    Direction::Backward => seek_after(ctx.source, &anchor.cursor),
                };
                let edge = match anchor.direction {
                    Direction::Forward => Edge::Tail,
                    Direction::Backward => Edge::Head,
                };
                (edge, anchor.direction, positioned)
            }
            _ => {
                let Some(cursor) = ctx.window.edge_entry(edge).map(|e| e.cursor.clone()) else {
                    return FetchReport::default();
                };
                let positioned = match edge {
                    Edge::Tail => seek_after(ctx.source, &cursor),
                    Edge::Head => ctx.source.seek_cursor(&cursor),
                };
                (edge, edge.direction(), positioned)
            }
        };

        if let Err(e) = positioned {
            tracing::warn!(?edge, error = %e, "failed to position journal for fetch");
            abandon_edge(ctx.window, edge);
            return FetchReport {
                failed: true,
                ..FetchReport::default()
            };
        }

        let outcome = self.scan(ctx, direction, chunk, |_| true);
        let mut report = FetchReport {
            scanned: outcome.scanned,
            ..FetchReport::default()
        };

        match outcome.end {
            ScanEnd::Failed(e) => {
                tracing::warn!(
                    ?edge,
                    scanned = outcome.scanned,
                    error = %e,
                    "journal read failed mid-scan; treating edge as exhausted"
                );
                abandon_edge(ctx.window, edge);
                report.failed = true;
                return report;
            }
            ScanEnd::Exhausted => {
                ctx.window.set_more(edge, false);
                report.exhausted = true;
            }
            ScanEnd::Cancelled => report.cancelled = true,
            ScanEnd::Limit | ScanEnd::Bounded => {}
        }

        report.appended = outcome.matches.len();
        if report.appended > 0 {
            ctx.window.take_anchor();
        }
        ctx.window.extend(edge, outcome.matches);

        if let Some(max_rows) = self.max_rows
            && ctx.window.len() > max_rows
        {
            report.evicted = ctx.window.evict(edge.opposite(), ctx.window.len() - max_rows);
        }

        tracing::debug!(
            ?edge,
            appended = report.appended,
            scanned = report.scanned,
            evicted = report.evicted,
            rows = ctx.window.len(),
            "fetch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jv_journal::{EntryBuilder, MemoryJournal, Priority};
    use std::collections::HashSet;

    struct Fixture {
        source: MemoryJournal,
        filter: FilterSpec,
        window: WindowCache,
        cancel: CancellationToken,
    }

    impl Fixture {
        fn new(source: MemoryJournal) -> Self {
            Self {
                source,
                filter: FilterSpec::new(),
                window: WindowCache::new(),
                cancel: CancellationToken::new(),
            }
        }

        fn ctx(&mut self) -> ViewContext<'_> {
            ViewContext {
                source: &mut self.source,
                filter: &self.filter,
                window: &mut self.window,
                cancel: self.cancel.clone(),
            }
        }

        fn seqnums(&self) -> Vec<u64> {
            self.window.iter().map(|e| e.seqnum).collect()
        }
    }

    /// 1000 entries, t = 0..999 s; every 7th entry has priority Error.
    fn sparse_journal() -> MemoryJournal {
        MemoryJournal::from_entries(
            (0..1000)
                .map(|i| {
                    let priority = if i % 7 == 0 {
                        Priority::Error
                    } else {
                        Priority::Info
                    };
                    EntryBuilder::new(i, i as i64).priority(priority).build()
                })
                .collect(),
        )
    }

    fn scheduler(chunk: usize) -> FetchScheduler {
        FetchScheduler::from_config(&ViewConfig {
            chunk_size: chunk,
            ..ViewConfig::default()
        })
    }

    #[test]
    fn seek_head_sets_boundaries() {
        let mut fx = Fixture::new(MemoryJournal::sequential(20));
        let sched = scheduler(5);
        assert_eq!(sched.seek(&mut fx.ctx(), Edge::Head).unwrap(), SeekOutcome::Positioned);
        assert!(!fx.window.boundaries().more_at_head);
        assert!(fx.window.boundaries().more_at_tail);
        assert_eq!(fx.window.len(), 0);
    }

    #[test]
    fn seek_on_empty_stream_clears_both_flags() {
        let mut fx = Fixture::new(MemoryJournal::sequential(20));
        fx.filter.set_units(["absent.service"]);
        let sched = scheduler(5);
        assert_eq!(sched.seek(&mut fx.ctx(), Edge::Head).unwrap(), SeekOutcome::EmptyStream);
        assert_eq!(fx.window.boundaries(), Boundaries::default());
        assert!(!sched.can_fetch_more(&fx.window, Edge::Head));
        assert!(!sched.can_fetch_more(&fx.window, Edge::Tail));
        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Tail).appended, 0);
    }

    #[test]
    fn sparse_filter_fetch_scans_past_non_matching() {
        let mut fx = Fixture::new(sparse_journal());
        fx.filter.set_priority(3).unwrap();
        let sched = scheduler(10);
        sched.seek(&mut fx.ctx(), Edge::Head).unwrap();

        let report = sched.fetch_more(&mut fx.ctx(), Edge::Head);
        assert_eq!(report.appended, 10);
        assert_eq!(fx.window.len(), 10);
        assert_eq!(fx.seqnums(), (0..10).map(|i| i * 7).collect::<Vec<_>>());
        assert!(report.scanned >= 64);
        assert!(fx.window.iter().all(|e| e.priority <= Priority::Error));
    }

    #[test]
    fn head_then_tail_fetch_has_no_duplicates() {
        let mut fx = Fixture::new(sparse_journal());
        fx.filter.set_priority(3).unwrap();
        let sched = scheduler(10);
        sched.seek(&mut fx.ctx(), Edge::Head).unwrap();
        sched.fetch_more(&mut fx.ctx(), Edge::Head);
        sched.fetch_more(&mut fx.ctx(), Edge::Tail);

        assert_eq!(fx.window.len(), 20);
        let cursors: HashSet<_> = fx.window.iter().map(|e| e.cursor.clone()).collect();
        assert_eq!(cursors.len(), 20);
        let seqs = fx.seqnums();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn seek_tail_fills_backward_in_order() {
        let mut fx = Fixture::new(MemoryJournal::sequential(12));
        let sched = scheduler(5);
        sched.seek(&mut fx.ctx(), Edge::Tail).unwrap();
        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Tail).appended, 5);
        assert_eq!(fx.seqnums(), vec![7, 8, 9, 10, 11]);
        assert!(!sched.can_fetch_more(&fx.window, Edge::Tail));

        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Head).appended, 5);
        assert_eq!(fx.seqnums(), (2..12).collect::<Vec<_>>());
        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Head).appended, 2);
        assert!(!sched.can_fetch_more(&fx.window, Edge::Head));
    }

    #[test]
    fn exhausted_edge_fetch_is_noop() {
        let mut fx = Fixture::new(MemoryJournal::sequential(3));
        let sched = scheduler(10);
        sched.seek(&mut fx.ctx(), Edge::Head).unwrap();
        let report = sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert_eq!(report.appended, 3);
        assert!(report.exhausted);

        let before = fx.window.boundaries();
        let report = sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert_eq!(report, FetchReport::default());
        assert_eq!(fx.window.len(), 3);
        assert_eq!(fx.window.boundaries(), before);
    }

    #[test]
    fn read_failure_discards_chunk_and_exhausts_edge() {
        let source = MemoryJournal::sequential(100);
        let tap = source.tap();
        let mut fx = Fixture::new(source);
        let sched = scheduler(10);
        sched.seek(&mut fx.ctx(), Edge::Head).unwrap();
        sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert_eq!(fx.window.len(), 10);

        tap.fail_after(5);
        let report = sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert!(report.failed);
        assert_eq!(report.appended, 0);
        assert_eq!(fx.window.len(), 10);
        assert!(!sched.can_fetch_more(&fx.window, Edge::Tail));
    }

    #[test]
    fn failed_first_fill_ends_both_edges() {
        let source = MemoryJournal::sequential(100);
        let tap = source.tap();
        let cursor = source.entries()[50].cursor.clone();
        let mut fx = Fixture::new(source);
        let sched = scheduler(10);
        sched.seek_cursor(&mut fx.ctx(), &cursor).unwrap();
        assert!(sched.can_fetch_more(&fx.window, Edge::Head));

        tap.fail_after(0);
        let report = sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert!(report.failed);
        assert!(fx.window.is_empty());
        assert!(!sched.can_fetch_more(&fx.window, Edge::Tail));
        assert!(!sched.can_fetch_more(&fx.window, Edge::Head));
        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Head), FetchReport::default());

        // A fresh seek recovers once reads succeed again.
        tap.clear_failure();
        sched.seek_cursor(&mut fx.ctx(), &cursor).unwrap();
        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Head).appended, 10);
        assert_eq!(fx.seqnums(), (50..60).collect::<Vec<_>>());
    }

    #[test]
    fn cancelled_fetch_keeps_collected_rows() {
        let mut fx = Fixture::new(sparse_journal());
        fx.filter.set_priority(3).unwrap();
        let sched = FetchScheduler::from_config(&ViewConfig {
            chunk_size: 100,
            checkpoint_interval: 50,
            max_rows: None,
        });
        sched.seek(&mut fx.ctx(), Edge::Head).unwrap();
        fx.cancel.cancel();
        let report = sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert!(report.cancelled);
        assert_eq!(report.scanned, 50);
        assert_eq!(report.appended, 8); // seqnums 0, 7, ..., 49
        assert!(sched.can_fetch_more(&fx.window, Edge::Tail));
    }

    #[test]
    fn max_rows_evicts_opposite_edge() {
        let mut fx = Fixture::new(MemoryJournal::sequential(50));
        let sched = FetchScheduler::from_config(&ViewConfig {
            chunk_size: 10,
            checkpoint_interval: 4096,
            max_rows: Some(15),
        });
        sched.seek(&mut fx.ctx(), Edge::Head).unwrap();
        sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        let report = sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert_eq!(report.evicted, 5);
        assert_eq!(fx.seqnums(), (5..20).collect::<Vec<_>>());
        assert!(sched.can_fetch_more(&fx.window, Edge::Head));

        assert_eq!(sched.fetch_more(&mut fx.ctx(), Edge::Head).appended, 5);
        assert_eq!(fx.seqnums(), (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn seek_cursor_anchors_at_next_match() {
        let mut fx = Fixture::new(sparse_journal());
        fx.filter.set_priority(3).unwrap();
        let cursor = fx.source.entries()[10].cursor.clone();
        let sched = scheduler(3);
        assert_eq!(
            sched.seek_cursor(&mut fx.ctx(), &cursor).unwrap(),
            SeekOutcome::Positioned
        );
        sched.fetch_more(&mut fx.ctx(), Edge::Tail);
        assert_eq!(fx.seqnums(), vec![14, 21, 28]);
        sched.fetch_more(&mut fx.ctx(), Edge::Head);
        assert_eq!(fx.seqnums(), vec![0, 7, 14, 21, 28]);
    }

    #[test]
    fn seek_cursor_past_last_match_anchors_backward() {
        let mut fx = Fixture::new(sparse_journal());
        fx.filter.set_priority(3).unwrap();
        let cursor = fx.source.entries()[998].cursor.clone();
        let sched = scheduler(2);
        sched.seek_cursor(&mut fx.ctx(), &cursor).unwrap();
        sched.fetch_more(&mut fx.ctx(), Edge::Head);
        assert_eq!(fx.seqnums(), vec![987, 994]);
        assert!(!sched.can_fetch_more(&fx.window, Edge::Tail));
    }

    #[test]
    fn zero_chunk_size_ignored() {
        let mut sched = scheduler(10);
        sched.set_chunk_size(0);
        assert_eq!(sched.chunk_size(), 10);
        sched.set_chunk_size(25);
        assert_eq!(sched.chunk_size(), 25);
    }
}
