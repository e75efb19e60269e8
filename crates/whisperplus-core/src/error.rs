//! Error types shared across the crate.
//!
//! Native command failures all arrive as [`CommandError`]; every other concern
//! has its own enum so callers can match on what actually went wrong.

use thiserror::Error;

/// Marker the host puts in an error message when the captured audio was silent.
pub const SILENCE_MARKER: &str = "SILENCE_DETECTED";

/// A native host command failed. Carries the host's message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CommandError(String);

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }

    /// The host reported silence instead of a real failure
    pub fn is_silence(&self) -> bool {
        self.0.contains(SILENCE_MARKER)
    }

    /// The hotkey plugin refused a combo because it is already held by us
    pub fn is_already_registered(&self) -> bool {
        self.0.to_lowercase().contains("already registered")
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for CommandError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// The option cannot work in the current session (e.g. hold mode on Wayland)
    #[error("{0}")]
    Unsupported(String),

    #[error("autostart change failed: {0}")]
    Autostart(CommandError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RecordingError {
    /// A required credential is missing; the user has to fix settings
    #[error("{0}")]
    Configuration(String),

    #[error("busy: another recording or transcription is in progress")]
    Busy,

    #[error("native command failed: {0}")]
    Command(#[from] CommandError),
}

#[derive(Debug, Error)]
pub enum ShortcutError {
    #[error("hold mode is not available in a {session} session (key releases are not delivered)")]
    HoldModeUnsupported { session: String },

    #[error("failed to register shortcut '{combo}': {source}")]
    Registration {
        combo: String,
        #[source]
        source: CommandError,
    },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("download of '{0}' is already in progress")]
    AlreadyDownloading(String),

    #[error("model '{0}' is still present after deletion")]
    StillPresent(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
