//! systemd journal export format parser.
//!
//! Parses the serialization produced by `journalctl -o export`: entries are
//! separated by blank lines, text fields are `KEY=VALUE` lines, and fields
//! whose value contains control bytes are written as `KEY\n`, a little-endian
//! `u64` length, the raw value, and a trailing newline.

use chrono::{TimeZone, Utc};
use std::collections::HashMap;

use crate::error::{JournalError, JournalResult};
use crate::types::{Cursor, LogEntry, Priority};

/// Parse a complete export stream.
///
/// `origin` names the stream in synthesized cursors for entries that carry
/// no `__CURSOR` field. Entries without `MESSAGE` or `__REALTIME_TIMESTAMP`
/// are skipped.
pub fn parse_entries(data: &[u8], origin: &str) -> JournalResult<Vec<LogEntry>> {
    let mut entries = Vec::new();
    let mut current: HashMap<String, String> = HashMap::new();
    let mut offset = 0;
    let mut ordinal: u64 = 0;

    while offset < data.len() {
        let line_end = find_newline(data, offset).unwrap_or(data.len());
        let line = &data[offset..line_end];

        if line.is_empty() {
            offset = line_end + 1;
            if !current.is_empty() {
                if let Some(entry) = build_entry(&current, origin, ordinal) {
                    entries.push(entry);
                }
                ordinal += 1;
                current.clear();
            }
            continue;
        }

        if let Some(eq) = line.iter().position(|&b| b == b'=') {
            let key = String::from_utf8_lossy(&line[..eq]).into_owned();
            let value = String::from_utf8_lossy(&line[eq + 1..]).into_owned();
            current.insert(key, value);
            offset = line_end + 1;
        } else {
            // Binary field: name line, u64 LE length, payload, newline.
            let key = String::from_utf8_lossy(line).into_owned();
            let len_start = line_end + 1;
            let len_bytes: [u8; 8] = data
                .get(len_start..len_start + 8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| JournalError::Parse {
                    offset: len_start,
                    message: format!("truncated length for binary field {key}"),
                })?;
            let len = usize::try_from(u64::from_le_bytes(len_bytes)).map_err(|_| {
                JournalError::Parse {
                    offset: len_start,
                    message: format!("binary field {key} too large"),
                }
            })?;
            let value_start = len_start + 8;
            let value = value_start
                .checked_add(len)
                .and_then(|end| data.get(value_start..end))
                .ok_or_else(|| JournalError::Parse {
                    offset: value_start,
                    message: format!("truncated value for binary field {key}"),
                })?;
            current.insert(key, String::from_utf8_lossy(value).into_owned());
            offset = value_start + len + 1;
        }
    }

    // Handle last entry (no trailing blank line)
    if !current.is_empty()
        && let Some(entry) = build_entry(&current, origin, ordinal)
    {
        entries.push(entry);
    }

    Ok(entries)
}

fn find_newline(data: &[u8], from: usize) -> Option<usize> {
    data[from..].iter().position(|&b| b == b'\n').map(|p| from + p)
}

fn build_entry(fields: &HashMap<String, String>, origin: &str, ordinal: u64) -> Option<LogEntry> {
    let message = fields.get("MESSAGE")?.to_string();

    let realtime = fields
        .get("__REALTIME_TIMESTAMP")
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(|us| Utc.timestamp_micros(us).single());
    let Some(realtime) = realtime else {
        tracing::debug!(ordinal, "skipping export entry without realtime timestamp");
        return None;
    };

    let monotonic_usec = fields
        .get("__MONOTONIC_TIMESTAMP")
        .and_then(|ts| ts.parse::<u64>().ok())
        .unwrap_or_default();

    let priority = fields
        .get("PRIORITY")
        .and_then(|p| p.parse::<u8>().ok())
        .and_then(Priority::from_value)
        .unwrap_or_default();

    let seqnum = fields
        .get("__SEQNUM")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(ordinal);

    let cursor = match fields.get("__CURSOR") {
        Some(c) if !c.is_empty() => Cursor::new(c.clone()),
        _ => Cursor::new(format!("s={origin};i={ordinal:x}")),
    };

    Some(LogEntry {
        cursor,
        realtime,
        monotonic_usec,
        boot_id: fields.get("_BOOT_ID").cloned().unwrap_or_default(),
        priority,
        unit: fields.get("_SYSTEMD_UNIT").cloned(),
        exe: fields.get("_EXE").cloned(),
        transport: fields.get("_TRANSPORT").cloned(),
        message,
        seqnum,
    })
}

/// Check if a byte sample looks like journal export output.
pub fn looks_like_export(data: &[u8]) -> bool {
    data.split(|&b| b == b'\n').take(16).any(|l| {
        l.starts_with(b"__CURSOR=") || l.starts_with(b"__REALTIME_TIMESTAMP=")
    })
}
