//! Application settings persisted in the settings blob.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{RecordMode, TranscriptionEngine};
use crate::error::SettingsError;

pub const DEFAULT_SHORTCUT: &str = "Ctrl+Alt+Space";
pub const DEFAULT_LOCAL_MODEL: &str = "Tiny";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Field names of the settings blob
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_AGENT: &str = "userAgent";
    pub const AUTO_COPY: &str = "autoCopy";
    pub const AUTO_PASTE: &str = "autoPaste";
    pub const SOUND_ENABLED: &str = "soundEnabled";
    pub const SHORTCUT_ENABLED: &str = "shortcutEnabled";
    pub const RECORD_MODE: &str = "recordMode";
    pub const NOTIFICATION_ENABLED: &str = "notificationEnabled";
    pub const TRANSCRIPTION_ENGINE: &str = "transcriptionEngine";
    pub const LOCAL_MODEL: &str = "localModel";
    pub const USE_LOCAL_GPU: &str = "useLocalGPU";
    pub const GLOBAL_SHORTCUT: &str = "globalShortcut";
    pub const LOCAL_TRANSLATE: &str = "localTranslate";
    /// Lives in the OS, not in the blob
    pub const AUTOSTART: &str = "autostart";

    /// Every key written to the settings blob
    pub const PERSISTED: &[&str] = &[
        TOKEN,
        USER_AGENT,
        AUTO_COPY,
        AUTO_PASTE,
        SOUND_ENABLED,
        SHORTCUT_ENABLED,
        RECORD_MODE,
        NOTIFICATION_ENABLED,
        TRANSCRIPTION_ENGINE,
        LOCAL_MODEL,
        USE_LOCAL_GPU,
        GLOBAL_SHORTCUT,
        LOCAL_TRANSLATE,
    ];

    /// Keys restored by "reset to defaults"
    pub const RESETTABLE: &[&str] = &[
        AUTO_COPY,
        AUTO_PASTE,
        SOUND_ENABLED,
        NOTIFICATION_ENABLED,
        SHORTCUT_ENABLED,
        RECORD_MODE,
    ];

    /// Changing any of these requires re-registering the global shortcut
    pub const SHORTCUT_AFFECTING: &[&str] = &[SHORTCUT_ENABLED, RECORD_MODE, GLOBAL_SHORTCUT];
}

/// Singleton application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// ChatGPT session token for the cloud engine
    pub token: String,
    pub user_agent: String,
    pub auto_copy: bool,
    pub auto_paste: bool,
    pub sound_enabled: bool,
    pub shortcut_enabled: bool,
    pub record_mode: RecordMode,
    pub notification_enabled: bool,
    pub transcription_engine: TranscriptionEngine,
    pub local_model: String,
    #[serde(rename = "useLocalGPU")]
    pub use_local_gpu: bool,
    pub global_shortcut: String,
    pub local_translate: bool,
    /// Mirrors the OS autostart registration; never persisted
    #[serde(skip)]
    pub autostart: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auto_copy: true,
            auto_paste: true,
            sound_enabled: true,
            shortcut_enabled: true,
            record_mode: RecordMode::Toggle,
            notification_enabled: false,
            transcription_engine: TranscriptionEngine::Cloud,
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            use_local_gpu: false,
            global_shortcut: DEFAULT_SHORTCUT.to_string(),
            local_translate: false,
            autostart: false,
        }
    }
}

impl AppConfig {
    /// Merge stored entries over the defaults.
    ///
    /// Unknown keys are ignored and nulls count as missing. A value of the
    /// wrong type falls back to the default for that key.
    pub fn from_entries(entries: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let mut merged = defaults.to_entries();

        for key in keys::PERSISTED {
            let Some(value) = entries.get(*key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let previous = merged.insert(key.to_string(), value.clone());
            if serde_json::from_value::<Self>(Value::Object(merged.clone())).is_err() {
                log::warn!("Ignoring stored '{key}' = {value}: wrong type, using default");
                if let Some(previous) = previous {
                    merged.insert(key.to_string(), previous);
                }
            }
        }

        serde_json::from_value(Value::Object(merged)).unwrap_or(defaults)
    }

    /// Flatten into the key/value layout of the settings blob
    pub fn to_entries(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Check that `value` is acceptable for `key` and return the config with it applied
    pub fn with_value(&self, key: &str, value: Value) -> Result<Self, SettingsError> {
        if key == keys::AUTOSTART {
            return Err(SettingsError::Unsupported(
                "autostart is managed by the operating system, not the settings file".into(),
            ));
        }
        if !keys::PERSISTED.contains(&key) {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }

        let mut entries = self.to_entries();
        entries.insert(key.to_string(), value);
        let mut updated: Self =
            serde_json::from_value(Value::Object(entries)).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        updated.autostart = self.autostart;
        Ok(updated)
    }

    /// Keys whose values differ between `self` and `other`
    pub fn changed_keys(&self, other: &Self) -> Vec<&'static str> {
        let ours = self.to_entries();
        let theirs = other.to_entries();
        keys::PERSISTED
            .iter()
            .copied()
            .filter(|key| ours.get(*key) != theirs.get(*key))
            .collect()
    }

    /// Recording needs a token only when the cloud engine is active
    pub fn has_required_credentials(&self) -> bool {
        !self.transcription_engine.requires_token() || !self.token.trim().is_empty()
    }
}
