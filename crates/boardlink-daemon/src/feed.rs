//! JSON-lines event feed replayed into the tracker
//!
//! One event per line:
//! - `{"attach": [{"device": {...}} | {"endpoint": {...}}, ...]}`
//! - `{"detach": [...]}`
//! - `"reset"`
//! - `{"select": {"selectedDevice": {...}, "selectedEndpoint": {...}}}`
//!
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use boardlink_core::{AttachItem, InventoryDiff, Selection};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedEvent {
    Attach(Vec<AttachItem>),
    Detach(Vec<AttachItem>),
    Reset,
    Select(Selection),
}

/// Counters reported after a feed has been drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub applied: usize,
    pub rejected: usize,
    pub malformed: usize,
}

/// Parse one feed line; `None` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<FeedEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let event = serde_json::from_str(line)
        .with_context(|| format!("Invalid feed event: {}", line))?;
    Ok(Some(event))
}

/// Apply one event to the application state
pub fn apply_event(state: &AppState, event: FeedEvent) -> Result<()> {
    match event {
        FeedEvent::Attach(items) => state.discovery.apply(&InventoryDiff::attach(items))?,
        FeedEvent::Detach(items) => state.discovery.apply(&InventoryDiff::detach(items))?,
        FeedEvent::Reset => state.discovery.reset(),
        FeedEvent::Select(selection) => {
            state.tracker.set_selection(selection);
        }
    }
    Ok(())
}

/// Read events until EOF, applying each in order.
///
/// Malformed lines and rejected batches are logged and skipped.
pub async fn run_feed<R>(reader: R, state: &AppState) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed feed line");
                stats.malformed += 1;
                continue;
            }
        };

        match apply_event(state, event) {
            Ok(()) => stats.applied += 1,
            Err(e) => {
                warn!(line = line_no, error = %e, "Feed event rejected");
                stats.rejected += 1;
            }
        }
    }

    debug!(
        applied = stats.applied,
        rejected = stats.rejected,
        malformed = stats.malformed,
        "Feed drained"
    );
    Ok(stats)
}
