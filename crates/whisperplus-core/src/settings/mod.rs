//! Persisted preferences: the application settings and the SRT output preferences.

mod app;
mod srt;

pub use app::{AppConfig, DEFAULT_LOCAL_MODEL, DEFAULT_SHORTCUT, DEFAULT_USER_AGENT, keys};
pub use srt::{DuplicateHandling, FilenameMode, OutputPathMode, SrtConfig};
