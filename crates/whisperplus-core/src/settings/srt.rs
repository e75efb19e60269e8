//! Subtitle (SRT) output preferences.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::SettingsError;

/// How the output file is named
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilenameMode {
    /// Reuse the source file's stem
    #[default]
    Same,
    Custom,
}

/// Where the output file is written
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputPathMode {
    /// `Documents/WhisperOutputs`
    #[default]
    Default,
    /// Next to the source file
    SameAs,
}

/// What the host does when the output file already exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    Overwrite,
    #[default]
    Rename,
}

impl DuplicateHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateHandling::Overwrite => "overwrite",
            DuplicateHandling::Rename => "rename",
        }
    }
}

impl fmt::Display for DuplicateHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SrtConfig {
    /// Produce subtitles instead of plain text (local engine only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub filename_mode: FilenameMode,

    #[serde(default = "default_custom_filename")]
    pub custom_filename: String,

    #[serde(default)]
    pub output_path: OutputPathMode,

    #[serde(default)]
    pub duplicate_handling: DuplicateHandling,
}

fn default_custom_filename() -> String {
    "transcription".to_string()
}

impl Default for SrtConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename_mode: FilenameMode::Same,
            custom_filename: default_custom_filename(),
            output_path: OutputPathMode::Default,
            duplicate_handling: DuplicateHandling::Rename,
        }
    }
}

impl SrtConfig {
    pub const FIELDS: &'static [&'static str] = &[
        "enabled",
        "filenameMode",
        "customFilename",
        "outputPath",
        "duplicateHandling",
    ];

    /// Return a copy with one field replaced, validating the value's type
    pub fn with_field(&self, key: &str, value: Value) -> Result<Self, SettingsError> {
        if !Self::FIELDS.contains(&key) {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        let mut entries = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        entries.insert(key.to_string(), value);
        serde_json::from_value(Value::Object(entries)).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// The custom filename, cleaned up, when custom naming is active and it is not blank
    pub fn custom_stem(&self) -> Option<String> {
        if self.filename_mode != FilenameMode::Custom {
            return None;
        }
        let trimmed = self.custom_filename.trim();
        let stem = trimmed
            .strip_suffix(".srt")
            .or_else(|| trimmed.strip_suffix(".SRT"))
            .unwrap_or(trimmed);
        let cleaned: String = stem
            .chars()
            .filter(|c| !matches!(c, '/' | '\\'))
            .collect();
        let cleaned = cleaned.trim();
        (!cleaned.is_empty()).then(|| cleaned.to_string())
    }
}
