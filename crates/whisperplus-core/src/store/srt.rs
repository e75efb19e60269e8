//! Persisted SRT output preferences, stored under their own key.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

use super::KeyValueStore;
use crate::error::{SettingsError, StoreError};
use crate::settings::SrtConfig;

pub const SRT_CONFIG_KEY: &str = "srtConfig";

pub struct SrtConfigStore {
    store: Arc<dyn KeyValueStore>,
    cache: watch::Sender<SrtConfig>,
    write_lock: Mutex<()>,
}

impl SrtConfigStore {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let config = match store.get(SRT_CONFIG_KEY).await? {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("Stored SRT preferences are invalid ({e}), using defaults");
                SrtConfig::default()
            }),
            _ => SrtConfig::default(),
        };
        Ok(Self {
            store,
            cache: watch::Sender::new(config),
            write_lock: Mutex::new(()),
        })
    }

    pub fn get(&self) -> SrtConfig {
        self.cache.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SrtConfig> {
        self.cache.subscribe()
    }

    pub async fn update<F>(&self, mutate: F) -> Result<SrtConfig, StoreError>
    where
        F: FnOnce(&mut SrtConfig),
    {
        let _guard = self.write_lock.lock().await;
        let mut updated = self.get();
        mutate(&mut updated);
        self.persist(&updated).await?;
        self.cache.send_replace(updated.clone());
        Ok(updated)
    }

    /// Set one field from its JSON representation, e.g. `("outputPath", "sameas")`
    pub async fn set_field(&self, key: &str, value: Value) -> Result<SrtConfig, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let updated = self.get().with_field(key, value)?;
        self.persist(&updated).await?;
        self.cache.send_replace(updated.clone());
        log::info!("SRT preference '{key}' updated");
        Ok(updated)
    }

    async fn persist(&self, config: &SrtConfig) -> Result<(), StoreError> {
        self.store
            .set(SRT_CONFIG_KEY, serde_json::to_value(config)?)
            .await?;
        self.store.save().await
    }
}
