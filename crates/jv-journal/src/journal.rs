//! Export-backed journal: loads `journalctl -o export` output from disk or
//! from a `journalctl` subprocess and serves it through `JournalSource`.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{JournalError, JournalResult};
use crate::export;
use crate::memory::MemoryJournal;
use crate::source::{JournalSource, Step};
use crate::types::{Cursor, Field, LogEntry};

/// Where an `ExportJournal` was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalOrigin {
    Path(PathBuf),
    System,
}

/// A journal read from export-format data.
///
/// Opening never panics: failures produce an invalid, empty journal whose
/// `is_valid()` returns false, mirroring the boolean open contract callers
/// rely on.
pub struct ExportJournal {
    origin: JournalOrigin,
    inner: MemoryJournal,
    valid: bool,
}

impl ExportJournal {
    /// Open an export file, or every `*.export` file in a directory.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let origin = JournalOrigin::Path(path.to_path_buf());
        match load_path(path) {
            Ok(entries) => {
                tracing::info!(path = %path.display(), entries = entries.len(), "journal opened");
                Self::loaded(origin, entries)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to open journal");
                Self::invalid(origin)
            }
        }
    }

    /// Load the local system journal through `journalctl`.
    pub fn system() -> Self {
        match load_system() {
            Ok(entries) => {
                tracing::info!(entries = entries.len(), "system journal opened");
                Self::loaded(JournalOrigin::System, entries)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to open system journal");
                Self::invalid(JournalOrigin::System)
            }
        }
    }

    /// Build from already-parsed export data.
    pub fn from_bytes(data: &[u8], name: &str) -> JournalResult<Self> {
        let entries = export::parse_entries(data, name)?;
        Ok(Self::loaded(JournalOrigin::Path(PathBuf::from(name)), entries))
    }

    fn loaded(origin: JournalOrigin, entries: Vec<LogEntry>) -> Self {
        Self {
            origin,
            inner: MemoryJournal::from_entries(entries),
            valid: true,
        }
    }

    fn invalid(origin: JournalOrigin) -> Self {
        Self {
            origin,
            inner: MemoryJournal::new(),
            valid: false,
        }
    }

    pub fn origin(&self) -> &JournalOrigin {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn load_path(path: &Path) -> JournalResult<Vec<LogEntry>> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            JournalError::NotFound(path.display().to_string())
        } else {
            JournalError::Io(format!("{}: {e}", path.display()))
        }
    })?;

    if metadata.is_file() {
        return load_file(path);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| JournalError::Io(format!("{}: {e}", path.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "export"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(JournalError::NotFound(format!(
            "no .export files in {}",
            path.display()
        )));
    }

    let mut entries = Vec::new();
    for file in &files {
        entries.extend(load_file(file)?);
    }
    Ok(entries)
}

fn load_file(path: &Path) -> JournalResult<Vec<LogEntry>> {
    let data =
        std::fs::read(path).map_err(|e| JournalError::Io(format!("{}: {e}", path.display())))?;
    if !data.is_empty() && !export::looks_like_export(&data) {
        return Err(JournalError::Parse {
            offset: 0,
            message: format!("{} is not journal export data", path.display()),
        });
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    export::parse_entries(&data, &name)
}

fn load_system() -> JournalResult<Vec<LogEntry>> {
    let output = Command::new("journalctl")
        .arg("--output=export")
        .arg("--no-pager")
        .output()
        .map_err(|e| JournalError::Command(format!("failed to run journalctl: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(JournalError::Command(format!(
            "journalctl exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    export::parse_entries(&output.stdout, "system")
}

impl JournalSource for ExportJournal {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn current_boot_id(&self) -> Option<String> {
        if self.origin == JournalOrigin::System
            && let Ok(id) = std::fs::read_to_string("/proc/sys/kernel/random/boot_id")
        {
            return Some(id.trim().replace('-', ""));
        }
        self.inner.current_boot_id()
    }

    fn query_unique(&mut self, field: Field) -> JournalResult<Vec<String>> {
        self.inner.query_unique(field)
    }

    fn seek_head(&mut self) -> JournalResult<()> {
        self.inner.seek_head()
    }

    fn seek_tail(&mut self) -> JournalResult<()> {
        self.inner.seek_tail()
    }

    fn seek_cursor(&mut self, cursor: &Cursor) -> JournalResult<()> {
        self.inner.seek_cursor(cursor)
    }

    fn seek_realtime(&mut self, at: DateTime<Utc>) -> JournalResult<()> {
        self.inner.seek_realtime(at)
    }

    fn next(&mut self) -> JournalResult<Step> {
        self.inner.next()
    }

    fn previous(&mut self) -> JournalResult<Step> {
        self.inner.previous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ENTRY_A: &str = "__CURSOR=a\n__REALTIME_TIMESTAMP=2000000\n_BOOT_ID=b1\nMESSAGE=second\n\n";
    const ENTRY_B: &str = "__CURSOR=b\n__REALTIME_TIMESTAMP=1000000\n_BOOT_ID=b1\nMESSAGE=first\n\n";

    #[test]
    fn open_single_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{ENTRY_A}{ENTRY_B}").unwrap();

        let mut journal = ExportJournal::open(file.path());
        assert!(journal.is_valid());
        assert_eq!(journal.len(), 2);

        journal.seek_head().unwrap();
        match journal.next().unwrap() {
            Step::Entry(e) => assert_eq!(e.message, "first"),
            Step::End => panic!("expected entry"),
        }
    }

    #[test]
    fn open_directory_merges_export_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.export"), ENTRY_A).unwrap();
        std::fs::write(dir.path().join("b.export"), ENTRY_B).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let journal = ExportJournal::open(dir.path());
        assert!(journal.is_valid());
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn missing_path_is_invalid() {
        let journal = ExportJournal::open("/nonexistent/journal.export");
        assert!(!journal.is_valid());
        assert!(journal.is_empty());
    }

    #[test]
    fn non_export_file_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "<134>Jan 15 12:00:01 edge1 myapp: hello").unwrap();
        let journal = ExportJournal::open(file.path());
        assert!(!journal.is_valid());
    }

    #[test]
    fn from_bytes_parses() {
        let journal = ExportJournal::from_bytes(ENTRY_A.as_bytes(), "inline").unwrap();
        assert!(journal.is_valid());
        assert_eq!(journal.current_boot_id().as_deref(), Some("b1"));
    }
}
