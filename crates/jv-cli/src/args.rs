//! Command-line arguments.

use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "jv")]
#[command(about = "Browse, filter and search systemd journal exports")]
#[command(version)]
pub struct Cli {
    /// Configuration file. Missing files are ignored.
    #[arg(long, env = "JV_CONFIG", default_value = "/etc/jv/jv.toml")]
    pub config: PathBuf,

    /// Export file or directory of *.export files (default: system journal)
    #[arg(long, short = 'D')]
    pub path: Option<PathBuf>,

    /// Only show entries from this systemd unit (repeatable)
    #[arg(long, short = 'u')]
    pub unit: Vec<String>,

    /// Only show entries from this executable (repeatable)
    #[arg(long)]
    pub exe: Vec<String>,

    /// Only show entries from this boot id (repeatable)
    #[arg(long, short = 'b')]
    pub boot: Vec<String>,

    /// Only show entries from the running system's boot
    #[arg(long)]
    pub current_boot: bool,

    /// Include kernel messages
    #[arg(long, short = 'k')]
    pub kernel: bool,

    /// Highest priority shown, 0 (emergency) to 7 (debug)
    #[arg(long, short = 'p', value_parser = clap::value_parser!(u8).range(0..=7))]
    pub priority: Option<u8>,

    /// Start at the newest entries instead of the oldest
    #[arg(long, short = 'r')]
    pub tail: bool,

    /// Number of rows to print
    #[arg(long, short = 'n', default_value = "50")]
    pub lines: usize,

    /// Start at the first message containing this text (case-sensitive)
    #[arg(long, short = 'g', conflicts_with = "at")]
    pub search: Option<String>,

    /// Start at the entry nearest this RFC 3339 timestamp
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Matching entries read per fetch
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Row output format
    #[arg(long, short = 'o', value_enum)]
    pub format: Option<OutputFormat>,

    /// Emit diagnostics as JSON on stderr
    #[arg(long)]
    pub json_logs: bool,

    /// List the boots in the journal and exit
    #[arg(long)]
    pub list_boots: bool,
}
