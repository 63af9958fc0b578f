//! Library crate behind the `jv` binary.
//!
//! Exposes argument parsing, configuration, output formatting and the
//! browse runner so `jv-e2e-tests` can drive them without a subprocess.

pub mod args;
pub mod browse;
pub mod config;
pub mod output;
