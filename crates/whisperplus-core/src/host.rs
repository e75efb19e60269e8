//! Typed command surface of the native host.
//!
//! Audio capture, inference, model files, clipboard injection, notifications
//! and autostart all live in the host. This crate only sequences calls to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::CommandError;
use crate::settings::DuplicateHandling;

pub const EVENT_DOWNLOAD_PROGRESS: &str = "download_progress";
pub const EVENT_TRANSCRIBE_PROGRESS: &str = "transcribe-progress";
pub const EVENT_SRT_PROGRESS: &str = "srt-progress";
pub const EVENT_CLI_TOGGLE: &str = "cli-toggle";

/// Arguments for `generate_srt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtRequest {
    pub audio_path: PathBuf,
    pub model: String,
    /// Requested output; the host may pick another name when renaming duplicates
    pub output_path: PathBuf,
    pub translate: bool,
    pub use_gpu: bool,
    pub duplicate_mode: DuplicateHandling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub model_name: String,
    pub total: u64,
    pub downloaded: u64,
    pub percentage: f64,
}

/// Payload of both `transcribe-progress` and `srt-progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribeProgress {
    pub percentage: f64,
    pub processed_ms: u64,
    pub total_ms: u64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    /// Bytes
    pub total_memory: u64,
    pub free_memory: u64,
    pub cpu_cores: u32,
    pub has_nvidia: bool,
    pub has_amd: bool,
    /// Compute backend the local engine was built with, e.g. "CPU" or "CUDA"
    pub backend: String,
}

impl SystemStats {
    pub fn is_gpu_backend(&self) -> bool {
        !self.backend.eq_ignore_ascii_case("cpu")
    }

    /// Total RAM rounded to whole GiB
    pub fn memory_gb(&self) -> u64 {
        const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
        (self.total_memory as f64 / GIB).round() as u64
    }
}

/// Events pushed by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    DownloadProgress(DownloadProgress),
    TranscribeProgress(TranscribeProgress),
    SrtProgress(TranscribeProgress),
    /// External toggle request, e.g. from `whisperplus toggle` bound to an OS keybinding
    CliToggle,
}

impl HostEvent {
    /// Decode a named host event. Unknown names yield `Ok(None)`.
    pub fn from_raw(name: &str, payload: Value) -> Result<Option<Self>, serde_json::Error> {
        let event = match name {
            EVENT_DOWNLOAD_PROGRESS => Self::DownloadProgress(serde_json::from_value(payload)?),
            EVENT_TRANSCRIBE_PROGRESS => Self::TranscribeProgress(serde_json::from_value(payload)?),
            EVENT_SRT_PROGRESS => Self::SrtProgress(serde_json::from_value(payload)?),
            EVENT_CLI_TOGGLE => Self::CliToggle,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DownloadProgress(_) => EVENT_DOWNLOAD_PROGRESS,
            Self::TranscribeProgress(_) => EVENT_TRANSCRIBE_PROGRESS,
            Self::SrtProgress(_) => EVENT_SRT_PROGRESS,
            Self::CliToggle => EVENT_CLI_TOGGLE,
        }
    }
}

/// One method per native command.
#[async_trait]
pub trait NativeHost: Send + Sync {
    async fn start_recording(&self) -> Result<(), CommandError>;

    /// Ends capture and returns the recorded file
    async fn stop_recording(&self) -> Result<PathBuf, CommandError>;

    /// Cloud transcription
    async fn transcribe(&self, path: &Path, token: &str, user_agent: &str) -> Result<String, CommandError>;

    async fn transcribe_local(
        &self,
        path: &Path,
        model: &str,
        use_gpu: bool,
        translate: bool,
    ) -> Result<String, CommandError>;

    /// Returns the path actually written
    async fn generate_srt(&self, request: &SrtRequest) -> Result<PathBuf, CommandError>;

    async fn cancel_transcription(&self) -> Result<(), CommandError>;

    async fn write_clipboard(&self, text: &str) -> Result<(), CommandError>;

    /// Simulate the paste keystroke in the focused window
    async fn paste_text(&self) -> Result<(), CommandError>;

    async fn send_notification(&self, title: &str, body: &str) -> Result<(), CommandError>;

    async fn play_sound(&self, cue: SoundCue) -> Result<(), CommandError>;

    async fn open_link(&self, url: &str) -> Result<(), CommandError>;

    async fn check_model_exists(&self, model: &str) -> Result<bool, CommandError>;

    /// Resolves when the download finishes
    async fn download_model(&self, model: &str) -> Result<(), CommandError>;

    async fn cancel_download(&self, model: &str) -> Result<(), CommandError>;

    async fn delete_model(&self, model: &str) -> Result<(), CommandError>;

    async fn get_system_stats(&self) -> Result<SystemStats, CommandError>;

    /// "ubuntu", "fedora", "arch" or "unknown"
    async fn get_linux_distro(&self) -> Result<String, CommandError>;

    async fn get_session_type(&self) -> Result<String, CommandError>;

    async fn is_autostart_enabled(&self) -> Result<bool, CommandError>;

    async fn set_autostart(&self, enabled: bool) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_progress_events() {
        let event = HostEvent::from_raw(
            "download_progress",
            json!({ "model_name": "Base", "total": 100, "downloaded": 40, "percentage": 40.0 }),
        )
        .unwrap();
        assert!(matches!(event, Some(HostEvent::DownloadProgress(ref p)) if p.downloaded == 40));

        let event = HostEvent::from_raw(
            "srt-progress",
            json!({ "percentage": 12.5, "processed_ms": 1000, "total_ms": 8000 }),
        )
        .unwrap();
        assert!(matches!(event, Some(HostEvent::SrtProgress(ref p)) if p.status.is_empty()));
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert_eq!(HostEvent::from_raw("tray-click", Value::Null).unwrap(), None);
        assert_eq!(
            HostEvent::from_raw("cli-toggle", Value::Null).unwrap(),
            Some(HostEvent::CliToggle)
        );
    }

    #[test]
    fn stats_helpers() {
        let stats = SystemStats {
            total_memory: 16 * 1024 * 1024 * 1024,
            free_memory: 0,
            cpu_cores: 8,
            has_nvidia: true,
            has_amd: false,
            backend: "CPU".into(),
        };
        assert!(!stats.is_gpu_backend());
        assert_eq!(stats.memory_gb(), 16);
    }
}
