//! Shared test harness for E2E integration tests.
//!
//! Writes journal exports into a temporary directory so the real
//! `ExportJournal` reader sits under every view, and provides the
//! in-memory journals used for the paging properties.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use jv_journal::{EntryBuilder, LogEntry, MemoryJournal, Priority};
use jv_view::{Edge, JournalView, ViewConfig};

/// A journal export written to a temporary directory.
pub struct ExportFixture {
    dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl ExportFixture {
    /// Write `entries` as `system.export` inside a fresh directory.
    pub fn write(entries: &[LogEntry]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system.export");
        write_export(&path, entries);
        Self { dir, path }
    }

    /// Add another export file next to the first one.
    pub fn add_file(&self, name: &str, entries: &[LogEntry]) -> PathBuf {
        let path = self.dir.path().join(name);
        write_export(&path, entries);
        path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn view(&self, chunk: usize) -> JournalView {
        JournalView::open_path(&self.path, &config(chunk))
    }
}

pub fn config(chunk: usize) -> ViewConfig {
    ViewConfig {
        chunk_size: chunk,
        ..ViewConfig::default()
    }
}

/// Serialize entries in `journalctl -o export` form. Messages containing a
/// newline use the binary field encoding.
pub fn write_export(path: &Path, entries: &[LogEntry]) {
    let mut file = std::fs::File::create(path).unwrap();
    for entry in entries {
        writeln!(file, "__CURSOR={}", entry.cursor).unwrap();
        writeln!(
            file,
            "__REALTIME_TIMESTAMP={}",
            entry.realtime.timestamp_micros()
        )
        .unwrap();
        writeln!(file, "__MONOTONIC_TIMESTAMP={}", entry.monotonic_usec).unwrap();
        writeln!(file, "__SEQNUM={}", entry.seqnum).unwrap();
        writeln!(file, "_BOOT_ID={}", entry.boot_id).unwrap();
        writeln!(file, "PRIORITY={}", entry.priority.value()).unwrap();
        if let Some(unit) = &entry.unit {
            writeln!(file, "_SYSTEMD_UNIT={unit}").unwrap();
        }
        if let Some(exe) = &entry.exe {
            writeln!(file, "_EXE={exe}").unwrap();
        }
        if let Some(transport) = &entry.transport {
            writeln!(file, "_TRANSPORT={transport}").unwrap();
        }
        if entry.message.contains('\n') {
            file.write_all(b"MESSAGE\n").unwrap();
            file.write_all(&(entry.message.len() as u64).to_le_bytes())
                .unwrap();
            file.write_all(entry.message.as_bytes()).unwrap();
            file.write_all(b"\n").unwrap();
        } else {
            writeln!(file, "MESSAGE={}", entry.message).unwrap();
        }
        writeln!(file).unwrap();
    }
    file.flush().unwrap();
}

/// 1000 entries stamped 0..999 s; every 7th has priority `Error` (3), the
/// rest `Info` (6).
pub fn sparse_priority_entries() -> Vec<LogEntry> {
    (0..1000)
        .map(|i| {
            let priority = if i % 7 == 0 {
                Priority::Error
            } else {
                Priority::Info
            };
            EntryBuilder::new(i, i as i64).priority(priority).build()
        })
        .collect()
}

/// A mixed journal: two boots, several units and executables, kernel
/// messages every 10th entry.
pub fn mixed_entries() -> Vec<LogEntry> {
    (0..200)
        .map(|i| {
            let builder = EntryBuilder::new(i, 1_700_000_000 + i as i64)
                .boot(if i < 120 { "boot-a" } else { "boot-b" });
            let builder = match i % 10 {
                0 => builder.kernel().message(format!("kernel: event {i}")),
                1..=4 => builder
                    .unit("sshd.service")
                    .exe("/usr/sbin/sshd")
                    .message(format!("sshd session {i}")),
                5..=7 => builder
                    .unit("cron.service")
                    .exe("/usr/sbin/cron")
                    .message(format!("cron job {i}")),
                _ => builder
                    .unit("session-3.scope")
                    .exe("/usr/bin/bash")
                    .priority(Priority::Warning)
                    .message(format!("shell {i}")),
            };
            builder.build()
        })
        .collect()
}

pub fn memory_view(entries: Vec<LogEntry>, chunk: usize) -> JournalView {
    JournalView::new(Box::new(MemoryJournal::from_entries(entries)), &config(chunk))
}

/// Fetch at `edge` until it is exhausted; returns total rows added.
pub fn drain(view: &mut JournalView, edge: Edge) -> usize {
    let mut total = 0;
    while view.can_fetch_more(edge) {
        let added = view.fetch_more(edge);
        if added == 0 && view.can_fetch_more(edge) {
            panic!("fetch at {edge:?} made no progress");
        }
        total += added;
    }
    total
}

pub fn seqnums(view: &JournalView) -> Vec<u64> {
    view.rows().map(|e| e.seqnum).collect()
}

/// Window rows are unique and strictly ordered by position in the journal.
pub fn assert_window_consistent(view: &JournalView) {
    let cursors: HashSet<_> = view.rows().map(|e| e.cursor.clone()).collect();
    assert_eq!(cursors.len(), view.row_count(), "duplicate rows in window");
    let seqs = seqnums(view);
    assert!(
        seqs.windows(2).all(|w| w[0] < w[1]),
        "window rows out of order: {seqs:?}"
    );
}
