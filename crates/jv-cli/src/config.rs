//! Viewer configuration, loadable from TOML and overridden by flags.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use jv_view::{FilterSpec, ViewConfig};

use crate::args::Cli;
use crate::output::OutputFormat;

/// Top-level configuration for the `jv` binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub journal: JournalConfig,
    /// Engine tuning.
    #[serde(default)]
    pub view: ViewConfig,
    /// Filter applied before the first seek.
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalConfig {
    /// Export file or directory of `*.export` files. None reads the
    /// system journal through `journalctl`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub units: Vec<String>,
    #[serde(default)]
    pub exes: Vec<String>,
    #[serde(default)]
    pub boots: Vec<String>,
    /// Restrict to the running system's boot.
    #[serde(default)]
    pub current_boot: bool,
    #[serde(default)]
    pub kernel: bool,
    /// Highest priority value shown (0 = emergency .. 7 = debug).
    #[serde(default)]
    pub priority: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Emit diagnostics as JSON lines on stderr.
    #[serde(default)]
    pub json_logs: bool,
    /// Row format on stdout.
    #[serde(default)]
    pub format: OutputFormat,
}

impl CliConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Command-line flags win over file values.
    pub fn apply_args(&mut self, cli: &Cli) {
        if let Some(path) = &cli.path {
            self.journal.path = Some(path.clone());
        }
        if !cli.unit.is_empty() {
            self.filter.units = cli.unit.clone();
        }
        if !cli.exe.is_empty() {
            self.filter.exes = cli.exe.clone();
        }
        if !cli.boot.is_empty() {
            self.filter.boots = cli.boot.clone();
        }
        self.filter.current_boot |= cli.current_boot;
        self.filter.kernel |= cli.kernel;
        if cli.priority.is_some() {
            self.filter.priority = cli.priority;
        }
        if let Some(chunk) = cli.chunk_size {
            self.view.chunk_size = chunk;
        }
        if let Some(format) = cli.format {
            self.output.format = format;
        }
        self.output.json_logs |= cli.json_logs;
    }

    /// The configured filter. `current_boot` is resolved later, once the
    /// journal is open.
    pub fn filter_spec(&self) -> anyhow::Result<FilterSpec> {
        let mut spec = FilterSpec::new();
        spec.set_units(self.filter.units.iter().cloned());
        spec.set_exes(self.filter.exes.iter().cloned());
        spec.set_boots(self.filter.boots.iter().cloned());
        spec.set_kernel(self.filter.kernel);
        if let Some(priority) = self.filter.priority {
            spec.set_priority(priority)?;
        }
        Ok(spec)
    }
}
