//! Transcription Pipeline
//!
//! Orchestrates the post-capture half of a cycle:
//! 1. Pick exactly one path: cloud, local, or local + SRT
//! 2. Drop the result if the cycle was cancelled meanwhile
//! 3. Write one history entry (text, silence or error)
//! 4. Copy, paste and notify

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

use super::srt::srt_output_path;
use super::{Coordinator, CycleOutcome, RecordingPhase};
use crate::config::TranscriptionEngine;
use crate::error::{CommandError, RecordingError};
use crate::host::{SrtRequest, TranscribeProgress};
use crate::settings::{AppConfig, DEFAULT_LOCAL_MODEL, SrtConfig};
use crate::store::HistoryItem;

/// Paste attempts before giving up
pub const PASTE_ATTEMPTS: u32 = 3;
/// Delay before attempt `n` is `n` times this
pub const PASTE_BACKOFF_STEP: Duration = Duration::from_millis(200);

const NOTIFICATION_TITLE: &str = "Whisper+";
const MISSING_TOKEN: &str = "Please set your ChatGPT token in settings.";

/// Label stored with each history entry
pub fn backend_label(config: &AppConfig, srt: bool) -> &'static str {
    match (config.transcription_engine, srt, config.use_local_gpu) {
        (TranscriptionEngine::Cloud, _, _) => "Cloud (ChatGPT)",
        (TranscriptionEngine::Local, true, true) => "SRT (GPU)",
        (TranscriptionEngine::Local, true, false) => "SRT (CPU)",
        (TranscriptionEngine::Local, false, true) => "Local (GPU)",
        (TranscriptionEngine::Local, false, false) => "Local (CPU)",
    }
}

pub(super) enum Source {
    Recording { path: PathBuf, duration_ms: u64 },
    File { path: PathBuf },
}

impl Source {
    fn path(&self) -> &Path {
        match self {
            Source::Recording { path, .. } | Source::File { path } => path,
        }
    }

    fn duration_ms(&self) -> u64 {
        match self {
            Source::Recording { duration_ms, .. } => *duration_ms,
            Source::File { .. } => 0,
        }
    }

    fn is_file(&self) -> bool {
        matches!(self, Source::File { .. })
    }
}

enum Transcript {
    Text(String),
    Subtitles(PathBuf),
}

/// What happened to a transcript after it was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    NotCopied,
    Copied,
    Pasted,
    PasteFailed,
}

impl Delivery {
    fn notification_body(self) -> &'static str {
        match self {
            Delivery::Pasted => "Transcription pasted!",
            Delivery::Copied => "Transcription copied to clipboard. Press Ctrl+V to paste.",
            Delivery::PasteFailed => "Transcription copied to clipboard, but pasting failed. Press Ctrl+V to paste.",
            Delivery::NotCopied => "Transcription complete.",
        }
    }
}

fn model_name(config: &AppConfig) -> &str {
    let model = config.local_model.trim();
    if model.is_empty() { DEFAULT_LOCAL_MODEL } else { model }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcription.srt".to_string())
}

impl Coordinator {
    /// Transcribe an existing audio file. Rejected unless idle.
    pub async fn transcribe_file(&self, path: impl AsRef<Path>) -> Result<CycleOutcome, RecordingError> {
        let path = path.as_ref().to_path_buf();
        let config = self.config.get();
        let srt = self.srt.get();
        let use_srt = srt.enabled && config.transcription_engine == TranscriptionEngine::Local;

        let cycle = {
            let mut state = self.lock();
            if state.phase != RecordingPhase::Idle {
                drop(state);
                self.toasts.show("Busy recording or processing");
                return Err(RecordingError::Busy);
            }
            let cycle = state.begin_cycle(RecordingPhase::Transcribing);
            state.generating_srt = use_srt;
            self.publish(&state);
            cycle
        };

        log::info!("Transcribing file {} (cycle {cycle})", path.display());
        let _finalizer = self.transcribing_guard(cycle);
        Ok(self
            .run_transcription(cycle, Source::File { path }, &config, &srt)
            .await)
    }

    /// Generate subtitles for an existing audio file, independent of the
    /// "SRT output" preference. Requires the local engine.
    pub async fn generate_srt(
        &self,
        audio: impl AsRef<Path>,
        output: Option<PathBuf>,
    ) -> Result<CycleOutcome, RecordingError> {
        let audio = audio.as_ref().to_path_buf();
        let config = self.config.get();
        let srt = self.srt.get();

        let cycle = {
            let mut state = self.lock();
            if state.phase != RecordingPhase::Idle {
                drop(state);
                self.toasts.show("Busy with another task");
                return Err(RecordingError::Busy);
            }
            if config.transcription_engine != TranscriptionEngine::Local {
                drop(state);
                let message = "SRT generation requires local Whisper";
                self.toasts.show(message);
                return Err(RecordingError::Configuration(message.to_string()));
            }
            let cycle = state.begin_cycle(RecordingPhase::Transcribing);
            state.generating_srt = true;
            state.progress = Some(TranscribeProgress {
                percentage: 0.0,
                processed_ms: 0,
                total_ms: 0,
                status: "starting".to_string(),
            });
            self.publish(&state);
            cycle
        };
        let _finalizer = self.transcribing_guard(cycle);

        let id = self.history.next_id();
        let output_path = output.unwrap_or_else(|| {
            let naming = SrtConfig {
                duplicate_handling: srt.duplicate_handling,
                ..SrtConfig::default()
            };
            srt_output_path(&naming, &audio, true, &self.output_dir, id)
        });
        let request = SrtRequest {
            audio_path: audio,
            model: model_name(&config).to_string(),
            output_path,
            translate: config.local_translate,
            use_gpu: config.use_local_gpu,
            duplicate_mode: srt.duplicate_handling,
        };

        log::info!("Generating subtitles at {}", request.output_path.display());
        let started = Instant::now();
        let result = self.host.generate_srt(&request).await;
        if self.take_discard(cycle) {
            log::info!("Subtitle generation {cycle} was cancelled, discarding");
            return Ok(CycleOutcome::Discarded);
        }

        match result {
            Ok(written) => {
                let total_ms = self.snapshot().progress.map(|p| p.total_ms).unwrap_or(0);
                let mut item = HistoryItem::new(id, file_name_of(&written), total_ms)
                    .with_backend(backend_label(&config, true), started.elapsed().as_millis() as u64);
                item.is_srt = true;
                item.srt_path = Some(written.to_string_lossy().into_owned());
                self.record(&item).await;
                self.toasts.show("SRT file generated!");
                Ok(CycleOutcome::Transcribed(item))
            }
            Err(e) => {
                log::error!("SRT generation failed: {e}");
                self.toasts.show(format!("SRT Error: {e}"));
                Err(e.into())
            }
        }
    }

    /// The shared transcribe-and-record block. The caller owns the finalizer.
    pub(super) async fn run_transcription(
        &self,
        cycle: u64,
        source: Source,
        config: &AppConfig,
        srt: &SrtConfig,
    ) -> CycleOutcome {
        let id = self.history.next_id();
        let use_srt = srt.enabled && config.transcription_engine == TranscriptionEngine::Local;
        let backend = backend_label(config, use_srt);
        let started = Instant::now();
        log::info!("Transcribing with {backend}");

        let result: Result<Transcript, CommandError> = if use_srt {
            let request = SrtRequest {
                audio_path: source.path().to_path_buf(),
                model: model_name(config).to_string(),
                output_path: srt_output_path(srt, source.path(), source.is_file(), &self.output_dir, id),
                translate: config.local_translate,
                use_gpu: config.use_local_gpu,
                duplicate_mode: srt.duplicate_handling,
            };
            self.host.generate_srt(&request).await.map(Transcript::Subtitles)
        } else if config.transcription_engine == TranscriptionEngine::Local {
            self.host
                .transcribe_local(
                    source.path(),
                    model_name(config),
                    config.use_local_gpu,
                    config.local_translate,
                )
                .await
                .map(Transcript::Text)
        } else if config.token.trim().is_empty() {
            Err(CommandError::new(MISSING_TOKEN))
        } else {
            self.host
                .transcribe(source.path(), &config.token, &config.user_agent)
                .await
                .map(Transcript::Text)
        };

        // Cancellation join point: the host finished, but nobody wants the result
        if self.take_discard(cycle) {
            log::info!("Cycle {cycle} was cancelled, discarding its result");
            return CycleOutcome::Discarded;
        }

        let duration_ms = source.duration_ms();
        let processing_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Transcript::Subtitles(written)) => {
                let mut item =
                    HistoryItem::new(id, file_name_of(&written), duration_ms).with_backend(backend, processing_ms);
                item.is_srt = true;
                item.srt_path = Some(written.to_string_lossy().into_owned());
                self.record(&item).await;
                self.toasts.show("SRT file generated!");
                CycleOutcome::Transcribed(item)
            }
            Ok(Transcript::Text(text)) => {
                let item = HistoryItem::new(id, text, duration_ms).with_backend(backend, processing_ms);
                if item.text.trim().is_empty() {
                    return self.record_silence(item).await;
                }
                self.record(&item).await;
                self.deliver(&item.text, config).await;
                CycleOutcome::Transcribed(item)
            }
            Err(e) if e.is_silence() => {
                let item = HistoryItem::new(id, "", duration_ms).with_backend(backend, processing_ms);
                self.record_silence(item).await
            }
            Err(e) => {
                log::error!("Transcription failed: {e}");
                let item = HistoryItem::failure(id, e.to_string(), duration_ms);
                self.record(&item).await;
                self.toasts.show("Transcription failed");
                CycleOutcome::Failed(item)
            }
        }
    }

    /// Silence is a result, not an error: the empty entry is kept
    pub(super) async fn record_silence(&self, item: HistoryItem) -> CycleOutcome {
        self.record(&item).await;
        self.toasts.show("Skipped: Silence Detected");
        CycleOutcome::Silence(item)
    }

    async fn record(&self, item: &HistoryItem) {
        if let Err(e) = self.history.add(item.clone()).await {
            log::error!("Failed to save history entry {}: {e}", item.timestamp);
        }
    }

    async fn deliver(&self, text: &str, config: &AppConfig) {
        let delivery = if !config.auto_copy {
            Delivery::NotCopied
        } else if let Err(e) = self.host.write_clipboard(text).await {
            log::error!("Clipboard write failed: {e}");
            self.toasts.show("Copy to clipboard failed");
            Delivery::NotCopied
        } else if !config.auto_paste {
            Delivery::Copied
        } else if self.paste_with_retry().await {
            self.toasts.show("Pasted");
            Delivery::Pasted
        } else {
            self.toasts.show("Copied, paste failed");
            Delivery::PasteFailed
        };

        if config.notification_enabled {
            if let Err(e) = self
                .host
                .send_notification(NOTIFICATION_TITLE, delivery.notification_body())
                .await
            {
                log::warn!("Notification failed: {e}");
            }
        }
    }

    async fn paste_with_retry(&self) -> bool {
        for attempt in 1..=PASTE_ATTEMPTS {
            tokio::time::sleep(PASTE_BACKOFF_STEP * attempt).await;
            match self.host.paste_text().await {
                Ok(()) => return true,
                Err(e) => log::warn!("Paste attempt {attempt}/{PASTE_ATTEMPTS} failed: {e}"),
            }
        }
        false
    }
}
