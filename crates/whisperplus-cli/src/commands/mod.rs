pub mod config;
pub mod history;
pub mod shortcut;
pub mod srt;
pub mod toggle;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use whisperplus_core::{JsonFileStore, KeyValueStore, default_store_path};

/// Open the settings file the app uses, or `path` when given
pub async fn open_store(path: Option<&Path>) -> Result<Arc<dyn KeyValueStore>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_store_path);
    log::debug!("Using settings file {}", path.display());
    let store = JsonFileStore::open(&path)
        .await
        .with_context(|| format!("Failed to open settings file {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Command-line values are JSON when they parse as JSON (`true`, `3`,
/// `"x"`), otherwise plain strings
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render a value the way it would be typed back in
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
