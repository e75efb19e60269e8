//! Write-through cache of [`AppConfig`].

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

use super::KeyValueStore;
use crate::error::{SettingsError, StoreError};
use crate::host::NativeHost;
use crate::settings::AppConfig;

/// Settings store. Reads are synchronous from the cache; every write goes to
/// the backing store first and then updates the cache before returning, so a
/// read right after a write always sees the new value.
pub struct ConfigStore {
    store: Arc<dyn KeyValueStore>,
    cache: watch::Sender<AppConfig>,
    // Serializes writers so two updates cannot interleave their read-modify-write
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let entries = store.entries().await?;
        let config = AppConfig::from_entries(&entries);
        log::debug!(
            "Loaded settings: engine={}, mode={}, shortcut={}",
            config.transcription_engine,
            config.record_mode,
            config.global_shortcut
        );
        Ok(Self {
            store,
            cache: watch::Sender::new(config),
            write_lock: Mutex::new(()),
        })
    }

    pub fn get(&self) -> AppConfig {
        self.cache.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.cache.subscribe()
    }

    /// Validate and persist a single key from its JSON representation
    pub async fn update_setting(&self, key: &str, value: Value) -> Result<AppConfig, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let updated = self.get().with_value(key, value)?;
        self.persist(&[key], &updated).await?;
        self.cache.send_replace(updated.clone());
        log::info!("Setting '{key}' updated");
        Ok(updated)
    }

    /// Typed mutation. Only the keys that actually changed are written.
    pub async fn update<F>(&self, mutate: F) -> Result<AppConfig, SettingsError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let _guard = self.write_lock.lock().await;
        let current = self.get();
        let mut updated = current.clone();
        mutate(&mut updated);
        // autostart is owned by the host
        updated.autostart = current.autostart;

        let changed = current.changed_keys(&updated);
        if changed.is_empty() {
            return Ok(current);
        }
        self.persist(&changed, &updated).await?;
        self.cache.send_replace(updated.clone());
        log::info!("Settings updated: {}", changed.join(", "));
        Ok(updated)
    }

    /// Restore the behaviour toggles to their defaults. Credentials, engine,
    /// model and shortcut are kept.
    pub async fn reset_defaults(&self) -> Result<AppConfig, SettingsError> {
        let defaults = AppConfig::default();
        self.update(|config| {
            config.auto_copy = defaults.auto_copy;
            config.auto_paste = defaults.auto_paste;
            config.sound_enabled = defaults.sound_enabled;
            config.notification_enabled = defaults.notification_enabled;
            config.shortcut_enabled = defaults.shortcut_enabled;
            config.record_mode = defaults.record_mode;
        })
        .await
    }

    /// Re-read the autostart state from the host. Failures leave it off.
    pub async fn refresh_autostart(&self, host: &dyn NativeHost) -> bool {
        let enabled = match host.is_autostart_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                log::warn!("Autostart check failed: {e}");
                false
            }
        };
        self.cache.send_modify(|config| config.autostart = enabled);
        enabled
    }

    pub async fn set_autostart(&self, host: &dyn NativeHost, enabled: bool) -> Result<(), SettingsError> {
        host.set_autostart(enabled)
            .await
            .map_err(SettingsError::Autostart)?;
        self.cache.send_modify(|config| config.autostart = enabled);
        log::info!("Autostart {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    async fn persist(&self, changed: &[&str], updated: &AppConfig) -> Result<(), StoreError> {
        let entries = updated.to_entries();
        for key in changed {
            match entries.get(*key) {
                Some(value) => self.store.set(key, value.clone()).await?,
                None => {
                    return Err(StoreError::Backend(format!("no value for setting '{key}'")));
                }
            }
        }
        self.store.save().await
    }
}
