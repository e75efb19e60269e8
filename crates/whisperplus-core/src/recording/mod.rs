//! Recording Orchestration Module
//!
//! Drives one recording-or-import cycle at a time:
//! start capture → stop capture → transcribe (cloud, local or local + SRT)
//! → history → copy / paste / notify.
//!
//! ## Architecture
//!
//! ```text
//! recording/
//! ├── actions.rs     - Ordered action queue fed by hotkeys and IPC
//! ├── control.rs     - Start/stop/cancel/toggle
//! ├── pipeline.rs    - Transcription, history and delivery
//! ├── srt.rs         - Subtitle output path construction
//! └── mod.rs         - Coordinator state and phase snapshots
//! ```
//!
//! The phase lives behind a std mutex that is never held across an await.
//! Each cycle gets a numeric id so that late results of a cancelled cycle can
//! be recognised and thrown away without touching a newer cycle.

mod actions;
mod control;
mod pipeline;
mod srt;

pub use actions::{ActionSender, RecordingAction, spawn_action_worker};
pub use control::{CancelOutcome, StartOutcome, StopTicket, Toggled};
pub use pipeline::{PASTE_ATTEMPTS, PASTE_BACKOFF_STEP, backend_label};
pub use srt::{default_output_dir, srt_output_path};

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::host::{NativeHost, TranscribeProgress};
use crate::store::{ConfigStore, HistoryItem, HistoryStore, SrtConfigStore};
use crate::toast::Toasts;

/// Recordings shorter than this are treated as accidental activations
pub const MIN_RECORDING: Duration = Duration::from_millis(500);

/// Exactly one of these holds at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingPhase {
    #[default]
    Idle,
    Recording,
    Transcribing,
}

impl fmt::Display for RecordingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingPhase::Idle => "idle",
            RecordingPhase::Recording => "recording",
            RecordingPhase::Transcribing => "transcribing",
        };
        write!(f, "{name}")
    }
}

/// What the UI renders
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhaseSnapshot {
    pub phase: RecordingPhase,
    /// Id of the current (or last) cycle
    pub cycle: u64,
    pub generating_srt: bool,
    /// False while the host is still opening the capture device
    pub capture_ready: bool,
    pub started_at: Option<Instant>,
    pub progress: Option<TranscribeProgress>,
}

impl PhaseSnapshot {
    /// Time spent recording so far
    pub fn elapsed(&self) -> Option<Duration> {
        match self.phase {
            RecordingPhase::Recording => self.started_at.map(|t| t.elapsed()),
            _ => None,
        }
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Text or subtitles were produced and recorded
    Transcribed(HistoryItem),
    /// Nothing was said; an empty entry was recorded
    Silence(HistoryItem),
    /// The transcription failed; an error entry was recorded
    Failed(HistoryItem),
    /// Shorter than [`MIN_RECORDING`]; nothing recorded
    TooShort,
    /// The audio could not be retrieved from the host; nothing recorded
    StopFailed(String),
    /// The cycle was cancelled; its result was thrown away
    Discarded,
    /// Stop was requested while not recording
    Ignored,
}

impl CycleOutcome {
    pub fn history_item(&self) -> Option<&HistoryItem> {
        match self {
            CycleOutcome::Transcribed(item) | CycleOutcome::Silence(item) | CycleOutcome::Failed(item) => {
                Some(item)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct CycleState {
    phase: RecordingPhase,
    cycle: u64,
    last_cycle: u64,
    generating_srt: bool,
    capture_ready: bool,
    started_at: Option<Instant>,
    progress: Option<TranscribeProgress>,
    /// Cancelled cycles whose host call has not returned yet
    discarded: HashSet<u64>,
}

impl CycleState {
    fn snapshot(&self) -> PhaseSnapshot {
        PhaseSnapshot {
            phase: self.phase,
            cycle: self.cycle,
            generating_srt: self.generating_srt,
            capture_ready: self.capture_ready,
            started_at: self.started_at,
            progress: self.progress.clone(),
        }
    }

    fn begin_cycle(&mut self, phase: RecordingPhase) -> u64 {
        self.last_cycle += 1;
        self.cycle = self.last_cycle;
        self.phase = phase;
        self.generating_srt = false;
        self.capture_ready = false;
        self.started_at = None;
        self.progress = None;
        self.cycle
    }

    fn reset_to_idle(&mut self) {
        self.phase = RecordingPhase::Idle;
        self.generating_srt = false;
        self.capture_ready = false;
        self.started_at = None;
        self.progress = None;
    }

    fn is_current(&self, cycle: u64, phase: RecordingPhase) -> bool {
        self.cycle == cycle && self.phase == phase
    }
}

/// Long-lived owner of the recording cycle. UI layers read snapshots and
/// call its methods; it never depends on a rendering lifecycle.
pub struct Coordinator {
    host: Arc<dyn NativeHost>,
    config: Arc<ConfigStore>,
    srt: Arc<SrtConfigStore>,
    history: Arc<HistoryStore>,
    toasts: Toasts,
    output_dir: PathBuf,
    state: Mutex<CycleState>,
    snapshot: watch::Sender<PhaseSnapshot>,
}

impl Coordinator {
    pub fn new(
        host: Arc<dyn NativeHost>,
        config: Arc<ConfigStore>,
        srt: Arc<SrtConfigStore>,
        history: Arc<HistoryStore>,
        toasts: Toasts,
    ) -> Self {
        Self {
            host,
            config,
            srt,
            history,
            toasts,
            output_dir: default_output_dir(),
            state: Mutex::new(CycleState::default()),
            snapshot: watch::Sender::new(PhaseSnapshot::default()),
        }
    }

    /// Directory for subtitles when no other location applies
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn phase(&self) -> RecordingPhase {
        self.lock().phase
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        self.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<PhaseSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    /// Record progress of the running transcription (`transcribe-progress`)
    pub fn on_transcribe_progress(&self, progress: TranscribeProgress) {
        self.update_progress(progress, false);
    }

    /// Record progress of the running subtitle generation (`srt-progress`)
    pub fn on_srt_progress(&self, progress: TranscribeProgress) {
        self.update_progress(progress, true);
    }

    fn update_progress(&self, progress: TranscribeProgress, srt: bool) {
        let mut state = self.lock();
        if state.phase != RecordingPhase::Transcribing || (srt && !state.generating_srt) {
            log::debug!("Ignoring progress outside of an active transcription");
            return;
        }
        state.progress = Some(progress);
        self.publish(&state);
    }

    fn lock(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CycleState) {
        self.snapshot.send_replace(state.snapshot());
    }

    /// Consume the discard mark of `cycle`, if it was cancelled
    fn take_discard(&self, cycle: u64) -> bool {
        self.lock().discarded.remove(&cycle)
    }

    /// Arm the finalizer for a cycle in the Transcribing phase
    fn transcribing_guard(&self, cycle: u64) -> TranscribingGuard<'_> {
        TranscribingGuard {
            coordinator: self,
            cycle,
        }
    }
}

/// Returns the coordinator to Idle when a transcription cycle ends, however it
/// ends. A cycle that was already cancelled or superseded is left alone.
struct TranscribingGuard<'a> {
    coordinator: &'a Coordinator,
    cycle: u64,
}

impl Drop for TranscribingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.coordinator.lock();
        state.discarded.remove(&self.cycle);
        if state.is_current(self.cycle, RecordingPhase::Transcribing) {
            state.reset_to_idle();
            self.coordinator.publish(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_cycle_issues_increasing_ids() {
        let mut state = CycleState::default();
        let first = state.begin_cycle(RecordingPhase::Recording);
        state.reset_to_idle();
        let second = state.begin_cycle(RecordingPhase::Transcribing);
        assert!(second > first);
        assert!(state.is_current(second, RecordingPhase::Transcribing));
        assert!(!state.is_current(first, RecordingPhase::Transcribing));
    }

    #[test]
    fn elapsed_only_while_recording() {
        let snapshot = PhaseSnapshot {
            phase: RecordingPhase::Transcribing,
            started_at: Some(Instant::now()),
            ..PhaseSnapshot::default()
        };
        assert!(snapshot.elapsed().is_none());
    }
}
