//! Core journal data types: priorities, cursors, entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Priority ──────────────────────────────────────────────────

/// syslog priority of a journal entry.
///
/// Variant declaration order matters: `#[derive(Ord)]` follows the numeric
/// syslog value, so `Emergency < Alert < ... < Debug` and "more severe"
/// compares as "less than".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
}

impl Priority {
    /// All priorities, most severe first.
    pub const ALL: [Priority; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Info,
        Self::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Numeric syslog value (0 = most severe).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Map a numeric syslog priority (0–7) to `Priority`.
    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Cursor ────────────────────────────────────────────────────

/// Opaque position handle identifying exactly one journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Direction ─────────────────────────────────────────────────

/// Reading direction through the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards newer entries.
    Forward,
    /// Towards older entries.
    Backward,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

// ── Field ─────────────────────────────────────────────────────

/// Journal fields the viewer knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SystemdUnit,
    Exe,
    BootId,
    Transport,
    Priority,
}

impl Field {
    /// The journald field name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SystemdUnit => "_SYSTEMD_UNIT",
            Self::Exe => "_EXE",
            Self::BootId => "_BOOT_ID",
            Self::Transport => "_TRANSPORT",
            Self::Priority => "PRIORITY",
        }
    }
}

// ── Log Entry ─────────────────────────────────────────────────

/// One immutable journal record, as produced by a `JournalSource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub cursor: Cursor,
    pub realtime: DateTime<Utc>,
    /// Monotonic timestamp in microseconds since boot.
    pub monotonic_usec: u64,
    pub boot_id: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    /// `_TRANSPORT` value (e.g. "journal", "syslog", "kernel").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    pub message: String,
    /// Position of the entry in the source's total order.
    pub seqnum: u64,
}

impl LogEntry {
    /// Kernel messages are recognized by their `_TRANSPORT=kernel` field.
    pub fn is_kernel(&self) -> bool {
        self.transport.as_deref() == Some("kernel")
    }

    /// Value of a queryable field, if the entry carries one.
    pub fn field(&self, field: Field) -> Option<String> {
        match field {
            Field::SystemdUnit => self.unit.clone(),
            Field::Exe => self.exe.clone(),
            Field::BootId => Some(self.boot_id.clone()),
            Field::Transport => self.transport.clone(),
            Field::Priority => Some(self.priority.value().to_string()),
        }
    }
}
