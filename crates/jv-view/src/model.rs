//! `JournalView`: the single-owner facade over source, filter and window.
//!
//! Filter and source changes invalidate the window explicitly; the caller
//! re-seeks afterwards. Long operations (`fetch_more`, `search`,
//! `closest_index_for_data`) scan the source synchronously and should be
//! run through [`crate::worker::ViewHandle`] when latency matters.

use chrono::{DateTime, Utc};
use std::path::Path;

use jv_journal::{
    BootInfo, Cursor, Direction, ExportJournal, JournalResult, JournalSource, LogEntry,
    list_boots,
};
use tokio_util::sync::CancellationToken;

use crate::choices::FilterChoiceTree;
use crate::config::ViewConfig;
use crate::error::ViewResult;
use crate::fetch::{FetchReport, FetchScheduler, SeekOutcome, ViewContext};
use crate::filter::{FilterChange, FilterSpec};
use crate::nearest::NearestTimeLocator;
use crate::search::SearchEngine;
use crate::window::{Boundaries, Edge, WindowCache};

fn seek_succeeded(what: &str, result: JournalResult<SeekOutcome>) -> bool {
    match result {
        Ok(SeekOutcome::Positioned | SeekOutcome::EmptyStream) => true,
        Ok(SeekOutcome::Cancelled) => {
            tracing::info!(seek = what, "seek cancelled");
            false
        }
        Err(e) => {
            tracing::warn!(seek = what, error = %e, "seek failed");
            false
        }
    }
}

pub struct JournalView {
    source: Box<dyn JournalSource>,
    filter: FilterSpec,
    window: WindowCache,
    scheduler: FetchScheduler,
    /// Parent of every operation's token.
    cancel: CancellationToken,
}

impl JournalView {
    pub fn new(source: Box<dyn JournalSource>, config: &ViewConfig) -> Self {
        Self {
            source,
            filter: FilterSpec::new(),
            window: WindowCache::new(),
            scheduler: FetchScheduler::from_config(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Open an export file or directory.
    pub fn open_path(path: impl AsRef<Path>, config: &ViewConfig) -> Self {
        Self::new(Box::new(ExportJournal::open(path)), config)
    }

    fn parts(&mut self) -> (&FetchScheduler, ViewContext<'_>) {
        (
            &self.scheduler,
            ViewContext {
                source: self.source.as_mut(),
                filter: &self.filter,
                window: &mut self.window,
                cancel: self.cancel.child_token(),
            },
        )
    }

    // ── Source ────────────────────────────────────────────────

    /// Replace the journal. An invalid source is rejected and the current
    /// source and window stay as they were.
    pub fn set_journal(&mut self, source: Box<dyn JournalSource>) -> bool {
        if !source.is_valid() {
            tracing::warn!("rejecting invalid journal source");
            return false;
        }
        self.source = source;
        self.window.clear();
        true
    }

    pub fn set_journal_path(&mut self, path: impl AsRef<Path>) -> bool {
        self.set_journal(Box::new(ExportJournal::open(path)))
    }

    pub fn set_system_journal(&mut self) -> bool {
        self.set_journal(Box::new(ExportJournal::system()))
    }

    pub fn is_valid(&self) -> bool {
        self.source.is_valid()
    }

    pub fn current_boot_id(&self) -> Option<String> {
        self.source.current_boot_id()
    }

    // ── Filters ───────────────────────────────────────────────

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    fn invalidate(&mut self, change: Option<FilterChange>) -> Option<FilterChange> {
        if let Some(change) = change {
            tracing::debug!(?change, "filter changed; window invalidated");
            self.window.clear();
        }
        change
    }

    pub fn set_systemd_unit_filter<I, S>(&mut self, units: I) -> Option<FilterChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let change = self.filter.set_units(units);
        self.invalidate(change)
    }

    pub fn set_exe_filter<I, S>(&mut self, exes: I) -> Option<FilterChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let change = self.filter.set_exes(exes);
        self.invalidate(change)
    }

    pub fn set_boot_filter<I, S>(&mut self, boots: I) -> Option<FilterChange>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let change = self.filter.set_boots(boots);
        self.invalidate(change)
    }

    pub fn set_kernel_filter(&mut self, enabled: bool) -> Option<FilterChange> {
        let change = self.filter.set_kernel(enabled);
        self.invalidate(change)
    }

    /// Rejects thresholds above 7, keeping the previous filter and window.
    pub fn set_priority_filter(&mut self, threshold: u8) -> ViewResult<Option<FilterChange>> {
        let change = self.filter.set_priority(threshold)?;
        Ok(self.invalidate(change))
    }

    pub fn reset_priority_filter(&mut self) -> Option<FilterChange> {
        let change = self.filter.reset_priority();
        self.invalidate(change)
    }

    /// Replace the whole filter at once.
    pub fn apply_filter(&mut self, filter: FilterSpec) -> Vec<FilterChange> {
        let changes = self.filter.replace(filter);
        if !changes.is_empty() {
            tracing::debug!(?changes, "filter replaced; window invalidated");
            self.window.clear();
        }
        changes
    }

    // ── Window ────────────────────────────────────────────────

    /// Position at the oldest matching entry. The window is empty until the
    /// first `fetch_more`.
    pub fn seek_head(&mut self) -> bool {
        let (scheduler, mut ctx) = self.parts();
        let result = scheduler.seek(&mut ctx, Edge::Head);
        seek_succeeded("head", result)
    }

    /// Position at the newest matching entry.
    pub fn seek_tail(&mut self) -> bool {
        let (scheduler, mut ctx) = self.parts();
        let result = scheduler.seek(&mut ctx, Edge::Tail);
        seek_succeeded("tail", result)
    }

    /// Position at the matching entry at or after `cursor`, else the last
    /// one before it.
    pub fn seek_cursor(&mut self, cursor: &Cursor) -> bool {
        let (scheduler, mut ctx) = self.parts();
        let result = scheduler.seek_cursor(&mut ctx, cursor);
        seek_succeeded("cursor", result)
    }

    pub fn set_fetch_chunk_size(&mut self, size: usize) {
        self.scheduler.set_chunk_size(size);
    }

    pub fn fetch_chunk_size(&self) -> usize {
        self.scheduler.chunk_size()
    }

    pub fn can_fetch_more(&self, edge: Edge) -> bool {
        self.scheduler.can_fetch_more(&self.window, edge)
    }

    /// Grow the window by up to one chunk at `edge`; returns rows added.
    pub fn fetch_more(&mut self, edge: Edge) -> usize {
        let (scheduler, mut ctx) = self.parts();
        scheduler.fetch_more(&mut ctx, edge).appended
    }

    /// Fetch with an explicit chunk size and cancellation token.
    pub fn fetch_more_with(
        &mut self,
        edge: Edge,
        chunk: usize,
        cancel: &CancellationToken,
    ) -> FetchReport {
        let mut ctx = ViewContext {
            source: self.source.as_mut(),
            filter: &self.filter,
            window: &mut self.window,
            cancel: cancel.clone(),
        };
        self.scheduler.fetch_chunk(&mut ctx, edge, chunk)
    }

    pub fn row_count(&self) -> usize {
        self.window.len()
    }

    pub fn row_at(&self, row: usize) -> Option<&LogEntry> {
        self.window.get(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &LogEntry> {
        self.window.iter()
    }

    /// Timestamp of the entry at `row`.
    pub fn datetime(&self, row: usize) -> Option<DateTime<Utc>> {
        self.window.get(row).map(|e| e.realtime)
    }

    pub fn boundaries(&self) -> Boundaries {
        self.window.boundaries()
    }

    // ── Navigation ────────────────────────────────────────────

    /// See [`SearchEngine::search`].
    pub fn search(&mut self, query: &str, start_row: usize, direction: Direction) -> Option<usize> {
        let (scheduler, mut ctx) = self.parts();
        SearchEngine::new(scheduler).search(&mut ctx, query, start_row, direction)
    }

    /// See [`NearestTimeLocator::closest_index_for_data`].
    pub fn closest_index_for_data(&mut self, at: DateTime<Utc>) -> Option<usize> {
        let (scheduler, mut ctx) = self.parts();
        NearestTimeLocator::new(scheduler).closest_index_for_data(&mut ctx, at)
    }

    /// Parent token of every operation. Each operation scans under a child
    /// of it, so once cancelled every later scan stops at its first
    /// checkpoint until [`Self::set_cancel_token`] installs a fresh one.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn set_cancel_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    // ── Journal metadata ──────────────────────────────────────

    /// Boots in the journal, newest first. Does not touch the window.
    pub fn list_boots(&mut self) -> ViewResult<Vec<BootInfo>> {
        Ok(list_boots(self.source.as_mut())?)
    }

    /// Selectable filter values, with the current filter applied.
    pub fn filter_choices(&mut self) -> ViewResult<FilterChoiceTree> {
        let mut tree = FilterChoiceTree::build(self.source.as_mut())?;
        tree.sync_from(&self.filter);
        Ok(tree)
    }
}
