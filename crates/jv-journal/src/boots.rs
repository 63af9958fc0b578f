//! Boot listing: every boot id in a journal with the time span it covers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::JournalResult;
use crate::source::{JournalSource, Step};

/// One boot recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootInfo {
    pub boot_id: String,
    /// Realtime of the boot's oldest entry.
    pub since: DateTime<Utc>,
    /// Realtime of the boot's newest entry.
    pub until: DateTime<Utc>,
    /// Whether this is the running system's boot.
    pub current: bool,
}

/// Scan the whole journal and return its boots, newest first.
///
/// Leaves the source positioned at its tail.
pub fn list_boots(source: &mut dyn JournalSource) -> JournalResult<Vec<BootInfo>> {
    let current = source.current_boot_id();
    let mut spans: HashMap<String, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();

    source.seek_head()?;
    while let Step::Entry(entry) = source.next()? {
        if entry.boot_id.is_empty() {
            continue;
        }
        spans
            .entry(entry.boot_id)
            .and_modify(|(since, until)| {
                *since = (*since).min(entry.realtime);
                *until = (*until).max(entry.realtime);
            })
            .or_insert((entry.realtime, entry.realtime));
    }

    let mut boots: Vec<BootInfo> = spans
        .into_iter()
        .map(|(boot_id, (since, until))| BootInfo {
            current: current.as_deref() == Some(boot_id.as_str()),
            boot_id,
            since,
            until,
        })
        .collect();
    boots.sort_by(|a, b| b.since.cmp(&a.since));
    Ok(boots)
}
