//! Row and boot formatting for stdout.

use clap::ValueEnum;
use serde::Deserialize;
use std::io::{self, Write};

use jv_journal::{BootInfo, LogEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per entry.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

fn origin(entry: &LogEntry) -> &str {
    if entry.is_kernel() {
        return "kernel";
    }
    entry
        .unit
        .as_deref()
        .or(entry.exe.as_deref())
        .unwrap_or("-")
}

/// Render one entry without a trailing newline.
pub fn format_entry(entry: &LogEntry, format: OutputFormat) -> io::Result<String> {
    match format {
        OutputFormat::Text => Ok(format!(
            "{} {:<9} {}: {}",
            entry.realtime.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.priority.as_str(),
            origin(entry),
            entry.message
        )),
        OutputFormat::Json => serde_json::to_string(entry).map_err(io::Error::other),
    }
}

pub fn write_entries<'a>(
    out: &mut dyn Write,
    entries: impl IntoIterator<Item = &'a LogEntry>,
    format: OutputFormat,
) -> io::Result<()> {
    for entry in entries {
        writeln!(out, "{}", format_entry(entry, format)?)?;
    }
    Ok(())
}

pub fn write_boots(out: &mut dyn Write, boots: &[BootInfo], format: OutputFormat) -> io::Result<()> {
    for boot in boots {
        match format {
            OutputFormat::Text => writeln!(
                out,
                "{}{} {} - {}",
                if boot.current { "* " } else { "  " },
                boot.boot_id,
                boot.since.format("%Y-%m-%d %H:%M:%S"),
                boot.until.format("%Y-%m-%d %H:%M:%S"),
            )?,
            OutputFormat::Json => {
                writeln!(out, "{}", serde_json::to_string(boot).map_err(io::Error::other)?)?
            }
        }
    }
    Ok(())
}
