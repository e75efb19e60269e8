use serde::{Deserialize, Serialize};
use std::fmt;

/// Available transcription engines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionEngine {
    #[default]
    Cloud,
    Local,
}

impl TranscriptionEngine {
    /// Get the string identifier for this engine
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionEngine::Cloud => "cloud",
            TranscriptionEngine::Local => "local",
        }
    }

    /// Human-readable display name for this engine
    pub fn display_name(&self) -> &'static str {
        match self {
            TranscriptionEngine::Cloud => "Cloud (ChatGPT)",
            TranscriptionEngine::Local => "Local Whisper",
        }
    }

    /// Whether this engine needs a session token before recording can start
    pub fn requires_token(&self) -> bool {
        matches!(self, TranscriptionEngine::Cloud)
    }

    pub fn all() -> &'static [TranscriptionEngine] {
        &[TranscriptionEngine::Cloud, TranscriptionEngine::Local]
    }
}

impl fmt::Display for TranscriptionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TranscriptionEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloud" | "chatgpt" => Ok(TranscriptionEngine::Cloud),
            "local" | "whisper" => Ok(TranscriptionEngine::Local),
            _ => Err(format!("Unknown engine: {}. Available: cloud, local", s)),
        }
    }
}

/// How the global shortcut drives recording
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// Press to start, press again to stop
    #[default]
    Toggle,
    /// Record only while the key is held
    Hold,
}

impl RecordMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordMode::Toggle => "toggle",
            RecordMode::Hold => "hold",
        }
    }

    /// One-line usage hint shown next to the mode selector
    pub fn hint(&self) -> &'static str {
        match self {
            RecordMode::Toggle => "Press to Start, Press again to Stop.",
            RecordMode::Hold => "Hold to Record, Release to Stop.",
        }
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecordMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toggle" => Ok(RecordMode::Toggle),
            "hold" | "push-to-talk" | "ptt" => Ok(RecordMode::Hold),
            _ => Err(format!("Unknown record mode: {}. Available: toggle, hold", s)),
        }
    }
}
