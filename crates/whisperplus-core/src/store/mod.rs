//! Persisted key/value storage and the stores built on top of it.
//!
//! Everything lives in one JSON settings blob keyed by field name. The
//! [`KeyValueStore`] trait is the seam: the desktop shell can back it with its
//! own store plugin, the CLI and tests use [`JsonFileStore`] or [`MemoryStore`].

mod config;
mod history;
mod srt;

pub use config::ConfigStore;
pub use history::{HISTORY_KEY, HistoryEvent, HistoryItem, HistoryStore, MAX_HISTORY};
pub use srt::{SRT_CONFIG_KEY, SrtConfigStore};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::StoreError;

pub const SETTINGS_FILE: &str = "settings.json";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn entries(&self) -> Result<Map<String, Value>, StoreError>;

    /// Flush pending writes to durable storage
    async fn save(&self) -> Result<(), StoreError>;
}

/// `<config dir>/whisperplus/settings.json`
pub fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("whisperplus")
        .join(SETTINGS_FILE)
}

/// Settings blob kept in memory and written to a JSON file on `save`.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
    /// Serialises writers of the temp file and the rename
    save_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the file at `path`. A missing or empty file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                other => {
                    return Err(StoreError::Backend(format!(
                        "{} does not contain a JSON object (found {})",
                        path.display(),
                        json_kind(&other)
                    )));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };
        log::debug!("Opened settings store at {} ({} keys)", path.display(), data.len());
        Ok(Self {
            path,
            data: Mutex::new(data),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.data.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data.lock().await.remove(key).is_some())
    }

    async fn entries(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(self.data.lock().await.clone())
    }

    async fn save(&self) -> Result<(), StoreError> {
        let _saving = self.save_lock.lock().await;
        let content = {
            let data = self.data.lock().await;
            serde_json::to_string_pretty(&*data)?
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file, then rename over the real one
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

/// In-process store with no persistence.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Map<String, Value>) -> Self {
        Self {
            data: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.data.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data.lock().await.remove(key).is_some())
    }

    async fn entries(&self) -> Result<Map<String, Value>, StoreError> {
        Ok(self.data.lock().await.clone())
    }

    async fn save(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
