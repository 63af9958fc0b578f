//! In-memory journal: pre-loaded entries plus step counting and scripted
//! read failures for tests.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{JournalError, JournalResult};
use crate::source::{JournalSource, Step};
use crate::types::{Cursor, Field, LogEntry, Priority};

// ── Entry builder ─────────────────────────────────────────────

/// Builder for hand-written journal entries.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    entry: LogEntry,
}

impl EntryBuilder {
    /// Start an entry with sequence number `seqnum`, stamped `secs` seconds
    /// after the epoch. The cursor is derived from the sequence number.
    pub fn new(seqnum: u64, secs: i64) -> Self {
        let realtime = Utc.timestamp_opt(secs, 0).single().unwrap_or_default();
        Self {
            entry: LogEntry {
                cursor: Cursor::new(format!("s=mem;i={seqnum:x}")),
                realtime,
                monotonic_usec: seqnum * 1_000,
                boot_id: "boot-0".to_string(),
                priority: Priority::Info,
                unit: None,
                exe: None,
                transport: Some("journal".to_string()),
                message: format!("message {seqnum}"),
                seqnum,
            },
        }
    }

    pub fn realtime(mut self, at: DateTime<Utc>) -> Self {
        self.entry.realtime = at;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.entry.message = message.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.entry.priority = priority;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.entry.unit = Some(unit.into());
        self
    }

    pub fn exe(mut self, exe: impl Into<String>) -> Self {
        self.entry.exe = Some(exe.into());
        self
    }

    pub fn boot(mut self, boot_id: impl Into<String>) -> Self {
        self.entry.boot_id = boot_id.into();
        self
    }

    /// Mark as a kernel message (`_TRANSPORT=kernel`, no executable).
    pub fn kernel(mut self) -> Self {
        self.entry.transport = Some("kernel".to_string());
        self.entry.exe = None;
        self
    }

    pub fn build(self) -> LogEntry {
        self.entry
    }
}

// ── Tap ───────────────────────────────────────────────────────

/// Shared handle for observing and scripting a `MemoryJournal` after it has
/// been handed to its owner.
#[derive(Debug, Clone)]
pub struct JournalTap {
    steps: Arc<AtomicU64>,
    fail_at: Arc<AtomicU64>,
}

impl JournalTap {
    fn new() -> Self {
        Self {
            steps: Arc::new(AtomicU64::new(0)),
            fail_at: Arc::new(AtomicU64::new(u64::MAX)),
        }
    }

    /// Total `next`/`previous` calls served so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Make every step fail once `n` further steps have succeeded.
    pub fn fail_after(&self, n: u64) {
        self.fail_at.store(self.steps() + n, Ordering::SeqCst);
    }

    pub fn clear_failure(&self) {
        self.fail_at.store(u64::MAX, Ordering::SeqCst);
    }

    fn record_step(&self) -> JournalResult<()> {
        let step = self.steps.fetch_add(1, Ordering::SeqCst);
        if step >= self.fail_at.load(Ordering::SeqCst) {
            return Err(JournalError::Io("injected read failure".into()));
        }
        Ok(())
    }
}

// ── Memory journal ────────────────────────────────────────────

/// A journal held entirely in memory, ordered by realtime.
pub struct MemoryJournal {
    entries: Vec<LogEntry>,
    by_cursor: HashMap<Cursor, usize>,
    /// Gap index: `0` is before the first entry, `entries.len()` after the last.
    position: usize,
    current_boot: Option<String>,
    tap: JournalTap,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::from_entries(Vec::new())
    }

    /// Build from entries in any order; they are stably sorted by realtime.
    pub fn from_entries(mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by_key(|e| e.realtime);
        let by_cursor = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.cursor.clone(), i))
            .collect();
        Self {
            entries,
            by_cursor,
            position: 0,
            current_boot: None,
            tap: JournalTap::new(),
        }
    }

    /// `count` entries one second apart, starting at the epoch.
    pub fn sequential(count: u64) -> Self {
        Self::from_entries(
            (0..count)
                .map(|i| EntryBuilder::new(i, i as i64).build())
                .collect(),
        )
    }

    pub fn with_current_boot(mut self, boot_id: impl Into<String>) -> Self {
        self.current_boot = Some(boot_id.into());
        self
    }

    pub fn tap(&self) -> JournalTap {
        self.tap.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalSource for MemoryJournal {
    fn is_valid(&self) -> bool {
        true
    }

    fn current_boot_id(&self) -> Option<String> {
        self.current_boot
            .clone()
            .or_else(|| self.entries.last().map(|e| e.boot_id.clone()))
    }

    fn query_unique(&mut self, field: Field) -> JournalResult<Vec<String>> {
        let values: BTreeSet<String> = self.entries.iter().filter_map(|e| e.field(field)).collect();
        Ok(values.into_iter().collect())
    }

    fn seek_head(&mut self) -> JournalResult<()> {
        self.position = 0;
        Ok(())
    }

    fn seek_tail(&mut self) -> JournalResult<()> {
        self.position = self.entries.len();
        Ok(())
    }

    fn seek_cursor(&mut self, cursor: &Cursor) -> JournalResult<()> {
        let index = self
            .by_cursor
            .get(cursor)
            .copied()
            .ok_or_else(|| JournalError::CursorNotFound(cursor.to_string()))?;
        self.position = index;
        Ok(())
    }

    fn seek_realtime(&mut self, at: DateTime<Utc>) -> JournalResult<()> {
        self.position = self.entries.partition_point(|e| e.realtime < at);
        Ok(())
    }

    fn next(&mut self) -> JournalResult<Step> {
        self.tap.record_step()?;
        match self.entries.get(self.position) {
            Some(entry) => {
                self.position += 1;
                Ok(Step::Entry(entry.clone()))
            }
            None => Ok(Step::End),
        }
    }

    fn previous(&mut self) -> JournalResult<Step> {
        self.tap.record_step()?;
        if self.position == 0 {
            return Ok(Step::End);
        }
        self.position -= 1;
        Ok(Step::Entry(self.entries[self.position].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_forward(journal: &mut MemoryJournal) -> Vec<u64> {
        let mut seen = Vec::new();
        while let Step::Entry(e) = journal.next().unwrap() {
            seen.push(e.seqnum);
        }
        seen
    }

    #[test]
    fn steps_forward_from_head() {
        let mut journal = MemoryJournal::sequential(4);
        journal.seek_head().unwrap();
        assert_eq!(collect_forward(&mut journal), vec![0, 1, 2, 3]);
        assert_eq!(journal.next().unwrap(), Step::End);
    }

    #[test]
    fn steps_backward_from_tail() {
        let mut journal = MemoryJournal::sequential(3);
        journal.seek_tail().unwrap();
        let mut seen = Vec::new();
        while let Step::Entry(e) = journal.previous().unwrap() {
            seen.push(e.seqnum);
        }
        assert_eq!(seen, vec![2, 1, 0]);
    }

    #[test]
    fn seek_cursor_lands_before_entry() {
        let mut journal = MemoryJournal::sequential(5);
        let cursor = journal.entries()[2].cursor.clone();
        journal.seek_cursor(&cursor).unwrap();
        match journal.next().unwrap() {
            Step::Entry(e) => assert_eq!(e.seqnum, 2),
            Step::End => panic!("expected entry"),
        }
        journal.seek_cursor(&cursor).unwrap();
        match journal.previous().unwrap() {
            Step::Entry(e) => assert_eq!(e.seqnum, 1),
            Step::End => panic!("expected entry"),
        }
    }

    #[test]
    fn seek_unknown_cursor_fails() {
        let mut journal = MemoryJournal::sequential(2);
        let result = journal.seek_cursor(&Cursor::new("nope"));
        assert!(matches!(result, Err(JournalError::CursorNotFound(_))));
    }

    #[test]
    fn seek_realtime_finds_first_not_older() {
        let mut journal = MemoryJournal::sequential(10);
        let at = Utc.timestamp_opt(4, 500_000_000).unwrap();
        journal.seek_realtime(at).unwrap();
        match journal.next().unwrap() {
            Step::Entry(e) => assert_eq!(e.seqnum, 5),
            Step::End => panic!("expected entry"),
        }
    }

    #[test]
    fn entries_sorted_by_realtime() {
        let journal = MemoryJournal::from_entries(vec![
            EntryBuilder::new(1, 20).build(),
            EntryBuilder::new(0, 10).build(),
        ]);
        assert_eq!(journal.entries()[0].seqnum, 0);
    }

    #[test]
    fn tap_counts_and_injects_failures() {
        let mut journal = MemoryJournal::sequential(10);
        let tap = journal.tap();
        journal.seek_head().unwrap();
        journal.next().unwrap();
        journal.next().unwrap();
        assert_eq!(tap.steps(), 2);

        tap.fail_after(1);
        assert!(journal.next().is_ok());
        assert!(journal.next().is_err());
        tap.clear_failure();
        assert!(journal.next().is_ok());
    }

    #[test]
    fn query_unique_units() {
        let mut journal = MemoryJournal::from_entries(vec![
            EntryBuilder::new(0, 0).unit("b.service").build(),
            EntryBuilder::new(1, 1).unit("a.service").build(),
            EntryBuilder::new(2, 2).unit("b.service").build(),
            EntryBuilder::new(3, 3).build(),
        ]);
        let units = journal.query_unique(Field::SystemdUnit).unwrap();
        assert_eq!(units, vec!["a.service", "b.service"]);
    }

    #[test]
    fn current_boot_defaults_to_newest_entry() {
        let journal = MemoryJournal::from_entries(vec![
            EntryBuilder::new(0, 0).boot("old").build(),
            EntryBuilder::new(1, 1).boot("new").build(),
        ]);
        assert_eq!(journal.current_boot_id().as_deref(), Some("new"));
        let pinned = MemoryJournal::sequential(1).with_current_boot("pinned");
        assert_eq!(pinned.current_boot_id().as_deref(), Some("pinned"));
    }
}
