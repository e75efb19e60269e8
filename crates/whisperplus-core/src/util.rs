//! Formatting helpers for history entries.

use chrono::{DateTime, Utc};

/// Relative age of a history entry: "Just now", "5m ago", "3h ago", else "Mar 4"
pub fn time_ago(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = (now_ms - timestamp_ms).max(0) / 1000;
    if diff < 60 {
        return "Just now".to_string();
    }
    if diff < 3600 {
        return format!("{}m ago", diff / 60);
    }
    if diff < 86_400 {
        return format!("{}h ago", diff / 3600);
    }
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(date) => date.format("%b %-d").to_string(),
        None => "Unknown".to_string(),
    }
}

/// `m:ss`
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
