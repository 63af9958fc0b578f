//! `jv`: browse, filter and search systemd journal exports.
//!
//! Rows go to stdout; diagnostics go to stderr through `tracing`.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jv_cli::args::Cli;
use jv_cli::browse::{self, Request};
use jv_cli::config::CliConfig;
use jv_view::ViewHandle;

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Load config ─────────────────────────────────────────────
    let mut config = CliConfig::load(&cli.config)?;
    config.apply_args(&cli);
    init_tracing(config.output.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "jv starting"
    );

    // ── Open journal ────────────────────────────────────────────
    let view = browse::open_view(&config)?;
    let handle = ViewHandle::spawn(view)?;
    let request = Request::from(&cli);
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = browse::run(&handle, &request, config.output.format, &mut stdout) => {
            let written = result?;
            tracing::debug!(written, "done");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted; cancelling scan");
            handle.cancel();
        }
    }

    Ok(())
}
