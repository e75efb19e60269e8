//! Subtitle output path construction.
//!
//! Name precedence is the same for recordings and file imports:
//! 1. the custom filename, when custom naming is on and it is not blank
//! 2. the source file's stem
//! 3. `transcription` for imports, `recording_<timestamp>` for recordings
//!
//! "Same as source" only applies to imports. Recordings always go to the
//! default directory because their source is a temporary capture file.

use std::path::{Path, PathBuf};

use crate::settings::{OutputPathMode, SrtConfig};

const OUTPUT_DIR_NAME: &str = "WhisperOutputs";

/// `Documents/WhisperOutputs`, or `~/WhisperOutputs` when there is no documents dir
pub fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(OUTPUT_DIR_NAME)
}

pub fn srt_output_path(
    config: &SrtConfig,
    source: &Path,
    from_file: bool,
    default_dir: &Path,
    timestamp: i64,
) -> PathBuf {
    let stem = config
        .custom_stem()
        .or_else(|| {
            source
                .file_stem()
                .map(|s| s.to_string_lossy().trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| {
            if from_file {
                "transcription".to_string()
            } else {
                format!("recording_{timestamp}")
            }
        });

    let dir = match (config.output_path, from_file) {
        (OutputPathMode::SameAs, true) => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(default_dir),
        _ => default_dir,
    };

    dir.join(format!("{stem}.srt"))
}
