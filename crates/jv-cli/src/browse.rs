//! One non-interactive browse: open, filter, position, print.

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use std::io::Write;

use jv_journal::{Direction, ExportJournal};
use jv_view::{Edge, JournalView, ViewHandle};

use crate::args::Cli;
use crate::config::CliConfig;
use crate::output::{self, OutputFormat};

/// What to print.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Start from the newest entries.
    pub tail: bool,
    pub lines: usize,
    pub search: Option<String>,
    pub at: Option<DateTime<Utc>>,
    pub list_boots: bool,
}

impl From<&Cli> for Request {
    fn from(cli: &Cli) -> Self {
        Self {
            tail: cli.tail,
            lines: cli.lines,
            search: cli.search.clone(),
            at: cli.at,
            list_boots: cli.list_boots,
        }
    }
}

/// Open the configured journal and apply the configured filter.
pub fn open_view(config: &CliConfig) -> anyhow::Result<JournalView> {
    let mut view = match &config.journal.path {
        Some(path) => JournalView::open_path(path, &config.view),
        None => JournalView::new(Box::new(ExportJournal::system()), &config.view),
    };
    if !view.is_valid() {
        match &config.journal.path {
            Some(path) => bail!("could not open journal at {}", path.display()),
            None => bail!("could not read the system journal"),
        }
    }

    let mut filter = config.filter_spec()?;
    if config.filter.current_boot {
        match view.current_boot_id() {
            Some(boot) => {
                filter.set_boots([boot]);
            }
            None => tracing::warn!("current boot id unknown; not restricting by boot"),
        }
    }
    let changes = view.apply_filter(filter);
    tracing::debug!(?changes, "filter configured");
    Ok(view)
}

/// Execute `request` against the view behind `handle`, writing to `out`.
/// Returns the number of rows (or boots) written.
pub async fn run(
    handle: &ViewHandle,
    request: &Request,
    format: OutputFormat,
    out: &mut (dyn Write + Send),
) -> anyhow::Result<usize> {
    if request.list_boots {
        let boots = handle.call(|v| v.list_boots()).await??;
        output::write_boots(out, &boots, format)?;
        return Ok(boots.len());
    }

    let positioned = if request.tail {
        handle.seek_tail().await?
    } else {
        handle.seek_head().await?
    };
    if !positioned {
        bail!("failed to position the journal");
    }
    handle.fetch_more(Edge::Tail).await?;

    let Some(start) = start_row(handle, request).await? else {
        tracing::info!("no matching entry");
        return Ok(0);
    };

    let lines = request.lines;
    let rows = handle
        .call(move |v| {
            let anchor = v.row_at(start).map(|e| e.cursor.clone());
            while v.row_count() < start + lines && v.can_fetch_more(Edge::Tail) {
                if v.fetch_more(Edge::Tail) == 0 {
                    break;
                }
            }
            // Eviction may have shifted rows while growing the tail.
            let start = anchor
                .and_then(|c| v.rows().position(|e| e.cursor == c))
                .unwrap_or(start);
            v.rows().skip(start).take(lines).cloned().collect::<Vec<_>>()
        })
        .await
        .context("view worker stopped")?;

    output::write_entries(out, &rows, format)?;
    out.flush()?;
    Ok(rows.len())
}

async fn start_row(handle: &ViewHandle, request: &Request) -> anyhow::Result<Option<usize>> {
    if let Some(at) = request.at {
        return Ok(handle.closest_index_for_data(at).await?);
    }

    let tail = request.tail;
    if let Some(query) = request.search.clone() {
        let found = handle
            .call(move |v| {
                if tail {
                    return v.search(&query, v.row_count(), Direction::Backward);
                }
                if v.row_at(0).is_some_and(|e| e.message.contains(query.as_str())) {
                    return Some(0);
                }
                v.search(&query, 0, Direction::Forward)
            })
            .await?;
        return Ok(found);
    }

    if !tail {
        return Ok(Some(0));
    }
    let lines = request.lines;
    let start = handle
        .call(move |v| {
            while v.row_count() < lines && v.can_fetch_more(Edge::Head) {
                if v.fetch_more(Edge::Head) == 0 {
                    break;
                }
            }
            v.row_count().saturating_sub(lines)
        })
        .await?;
    Ok(Some(start))
}
