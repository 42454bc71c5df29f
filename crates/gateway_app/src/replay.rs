//! Recorded source feeds.
//!
//! A feed is a JSON-lines file with one [`SourceEvent`] per line. Blank lines
//! and lines starting with `#` are skipped.

use std::path::Path;

use anyhow::{Context, Result};
use gateway_protocol::SourceEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Parse a whole feed.
///
/// # Errors
///
/// Fails on I/O errors and on the first malformed line, naming its number.
pub async fn read_feed(path: &Path) -> Result<Vec<SourceEvent>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading feed {}", path.display()))?;
    parse_feed(&text).with_context(|| format!("parsing feed {}", path.display()))
}

pub fn parse_feed(text: &str) -> Result<Vec<SourceEvent>> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = SourceEvent::from_json_line(line)
            .with_context(|| format!("line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Push events into a session in order. Stops early if the session is gone.
pub async fn feed_session(events: Vec<SourceEvent>, tx: mpsc::Sender<SourceEvent>) {
    let total = events.len();
    for (sent, event) in events.into_iter().enumerate() {
        if tx.send(event).await.is_err() {
            debug!(sent, total, "session closed before the feed ended");
            return;
        }
    }
}
