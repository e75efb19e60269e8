use anyhow::{Context, Result, bail};
use std::io::Write;
use std::sync::Arc;
use whisperplus_core::{HistoryItem, HistoryStore, KeyValueStore, format_duration, time_ago};

use crate::args::HistoryCommand;

/// Longest transcript excerpt shown per list line
const PREVIEW_CHARS: usize = 80;

pub async fn run(command: HistoryCommand, store: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let history = HistoryStore::load(store)
        .await
        .context("Failed to load history")?;

    match command {
        HistoryCommand::List { search, limit } => {
            let items = match search.as_deref() {
                Some(filter) => history.search(filter).await,
                None => history.list().await,
            };
            if items.is_empty() {
                writeln!(out, "No history yet.")?;
                return Ok(());
            }
            let now = chrono::Utc::now().timestamp_millis();
            for item in items.iter().take(limit) {
                writeln!(out, "{}", list_line(item, now))?;
            }
        }
        HistoryCommand::Remove { id } => {
            if !history.remove(id).await? {
                bail!("No history entry with id {id}");
            }
            writeln!(out, "Removed {id}")?;
        }
        HistoryCommand::Clear => {
            history.clear().await?;
            writeln!(out, "History cleared")?;
        }
        HistoryCommand::Copy { id } => {
            let text = copy_target(&history, id).await?;
            copy(&text)?;
            writeln!(out, "Copied to clipboard")?;
        }
    }
    Ok(())
}

fn list_line(item: &HistoryItem, now_ms: i64) -> String {
    let body = if item.error {
        format!("Error: {}", item.text)
    } else if item.is_srt {
        format!("SRT: {}", item.srt_path.as_deref().unwrap_or(&item.text))
    } else if item.is_silence() {
        "(silence)".to_string()
    } else {
        preview(&item.text)
    };
    let backend = item
        .backend
        .as_deref()
        .map(|b| format!(" [{b}]"))
        .unwrap_or_default();
    format!(
        "{}  {:>9}  {}{backend}  {body}",
        item.timestamp,
        time_ago(item.timestamp, now_ms),
        format_duration(item.duration),
    )
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

async fn copy_target(history: &HistoryStore, id: Option<i64>) -> Result<String> {
    let item = match id {
        Some(id) => history
            .get(id)
            .await
            .with_context(|| format!("No history entry with id {id}"))?,
        None => history
            .list()
            .await
            .into_iter()
            .next()
            .context("History is empty")?,
    };
    match item.copy_text() {
        Some(text) => Ok(text.to_string()),
        None => bail!("Entry {} has nothing to copy", item.timestamp),
    }
}

#[cfg(feature = "clipboard")]
fn copy(text: &str) -> Result<()> {
    whisperplus_core::copy_to_clipboard(text)
}

#[cfg(not(feature = "clipboard"))]
fn copy(_text: &str) -> Result<()> {
    bail!("Clipboard support was not compiled in")
}
