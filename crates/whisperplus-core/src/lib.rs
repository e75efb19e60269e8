//! Core of the Whisper+ dictation app: the recording coordinator, persisted
//! settings and history, global shortcut handling and model management.
//!
//! Audio capture, inference, clipboard injection and OS integration live in
//! the native host and are reached through [`NativeHost`].

pub mod app;
#[cfg(feature = "clipboard")]
pub mod clipboard;
pub mod config;
pub mod error;
pub mod host;
pub mod ipc;
pub mod models;
pub mod recording;
pub mod settings;
pub mod shortcuts;
pub mod store;
pub mod toast;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{App, AppOptions};
#[cfg(feature = "clipboard")]
pub use clipboard::{ClipboardTool, copy_to_clipboard};
pub use config::{RecordMode, TranscriptionEngine};
pub use error::{
    CommandError, ModelError, RecordingError, SILENCE_MARKER, SettingsError, ShortcutError, StoreError,
};
pub use host::{DownloadProgress, HostEvent, NativeHost, SoundCue, SrtRequest, SystemStats, TranscribeProgress};
pub use models::{MODELS, ModelManager, ModelStatus};
pub use recording::{
    CancelOutcome, Coordinator, CycleOutcome, MIN_RECORDING, PhaseSnapshot, RecordingAction, RecordingPhase,
    StartOutcome, Toggled,
};
pub use settings::{AppConfig, SrtConfig};
pub use shortcuts::{Capabilities, HotkeyRegistrar, SessionType, ShortcutHandler, ShortcutManager, ShortcutState};
pub use store::{
    ConfigStore, HistoryEvent, HistoryItem, HistoryStore, JsonFileStore, KeyValueStore, MemoryStore,
    SrtConfigStore, default_store_path,
};
pub use toast::{Toast, Toasts};
pub use util::{format_duration, time_ago};
