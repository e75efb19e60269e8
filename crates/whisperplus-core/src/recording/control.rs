//! Recording Control
//!
//! Start, stop, cancel and toggle. Phase checks and transitions happen under
//! the state lock; host calls happen after it is released.

use std::time::Duration;
use tokio::time::Instant;

use super::pipeline::Source;
use super::{Coordinator, CycleOutcome, MIN_RECORDING, RecordingPhase};
use crate::config::TranscriptionEngine;
use crate::error::RecordingError;
use crate::host::SoundCue;
use crate::settings::{AppConfig, SrtConfig};
use crate::store::HistoryItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { cycle: u64 },
    /// Already recording; nothing happened
    AlreadyRecording,
    /// Cancelled while the capture device was opening; capture was released
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Idle; nothing to cancel
    Nothing,
    /// Recording stopped and thrown away
    RecordingDiscarded,
    /// The pending transcription result will be ignored
    TranscriptionCancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Toggled {
    Started(StartOutcome),
    Stopped(CycleOutcome),
}

/// A recording that has left the Recording phase and still needs its audio
/// collected and transcribed. Produced by [`Coordinator::begin_stop`].
#[derive(Debug)]
#[must_use = "a stop ticket must be passed to finish_stop"]
pub struct StopTicket {
    pub(super) cycle: u64,
    pub(super) duration: Duration,
    pub(super) config: AppConfig,
    pub(super) srt: SrtConfig,
}

impl StopTicket {
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Coordinator {
    /// Begin audio capture.
    ///
    /// A second call while recording is a no-op. While transcribing the call
    /// is rejected with a busy toast. Without a token the cloud engine cannot
    /// be used, so nothing is started.
    pub async fn start_record(&self) -> Result<StartOutcome, RecordingError> {
        let config = self.config.get();

        let cycle = {
            let mut state = self.lock();
            match state.phase {
                RecordingPhase::Recording => return Ok(StartOutcome::AlreadyRecording),
                RecordingPhase::Transcribing => {
                    drop(state);
                    self.toasts.show("Wait for previous task to finish");
                    return Err(RecordingError::Busy);
                }
                RecordingPhase::Idle => {}
            }
            if !config.has_required_credentials() {
                drop(state);
                let message = "Please set your ChatGPT token in settings first.";
                self.toasts.show(message);
                return Err(RecordingError::Configuration(message.to_string()));
            }
            let cycle = state.begin_cycle(RecordingPhase::Recording);
            self.publish(&state);
            cycle
        };

        log::info!("Starting recording (cycle {cycle})");
        if let Err(e) = self.host.start_recording().await {
            log::error!("Start recording failed: {e}");
            {
                let mut state = self.lock();
                if state.is_current(cycle, RecordingPhase::Recording) {
                    state.reset_to_idle();
                    self.publish(&state);
                }
            }
            self.toasts.show("Error starting recording");
            return Err(e.into());
        }

        let still_ours = {
            let mut state = self.lock();
            if state.is_current(cycle, RecordingPhase::Recording) {
                state.capture_ready = true;
                state.started_at = Some(Instant::now());
                self.publish(&state);
                true
            } else {
                false
            }
        };

        if !still_ours {
            log::info!("Recording {cycle} was cancelled while starting, releasing capture");
            if let Err(e) = self.host.stop_recording().await {
                log::debug!("Releasing abandoned capture failed: {e}");
            }
            return Ok(StartOutcome::Abandoned);
        }

        if config.sound_enabled {
            self.play(SoundCue::Start).await;
        }
        log::info!("Recording started");
        Ok(StartOutcome::Started { cycle })
    }

    /// Leave the Recording phase and enter Transcribing without waiting on any
    /// I/O. Returns `None` when there is no capture to stop.
    pub fn begin_stop(&self) -> Option<StopTicket> {
        let config = self.config.get();
        let srt = self.srt.get();

        let mut state = self.lock();
        if state.phase != RecordingPhase::Recording {
            return None;
        }
        if !state.capture_ready {
            log::debug!("Stop ignored: capture for cycle {} is still starting", state.cycle);
            return None;
        }

        let duration = state.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let generating_srt = srt.enabled && config.transcription_engine == TranscriptionEngine::Local;
        let cycle = state.cycle;

        state.phase = RecordingPhase::Transcribing;
        state.capture_ready = false;
        state.generating_srt = generating_srt;
        state.progress = None;
        self.publish(&state);

        Some(StopTicket {
            cycle,
            duration,
            config,
            srt,
        })
    }

    /// Collect the audio for a ticket from [`begin_stop`](Self::begin_stop)
    /// and run it through transcription.
    pub async fn finish_stop(&self, ticket: StopTicket) -> CycleOutcome {
        let _finalizer = self.transcribing_guard(ticket.cycle);

        if ticket.config.sound_enabled {
            self.play(SoundCue::End).await;
        }

        let stopped = self.host.stop_recording().await;
        if self.take_discard(ticket.cycle) {
            log::info!("Cycle {} was cancelled, discarding", ticket.cycle);
            return CycleOutcome::Discarded;
        }

        let duration_ms = ticket.duration.as_millis() as u64;
        if ticket.duration < MIN_RECORDING {
            log::info!("Recording too short ({duration_ms} ms), discarding");
            self.toasts.show("Too short, discarded");
            return CycleOutcome::TooShort;
        }

        let path = match stopped {
            Ok(path) => path,
            Err(e) if e.is_silence() => {
                log::info!("Host reported silence for cycle {}", ticket.cycle);
                let item = HistoryItem::new(self.history.next_id(), "", duration_ms);
                return self.record_silence(item).await;
            }
            Err(e) => {
                log::error!("Stop recording failed: {e}");
                self.toasts.show("Error processing audio");
                return CycleOutcome::StopFailed(e.to_string());
            }
        };

        let source = Source::Recording {
            path,
            duration_ms,
        };
        self.run_transcription(ticket.cycle, source, &ticket.config, &ticket.srt)
            .await
    }

    /// End capture and transcribe. Does nothing unless recording.
    pub async fn stop_record(&self) -> CycleOutcome {
        match self.begin_stop() {
            Some(ticket) => self.finish_stop(ticket).await,
            None => CycleOutcome::Ignored,
        }
    }

    /// Throw away the current cycle.
    ///
    /// While transcribing, the host's work is not aborted: its result is
    /// ignored when it arrives. While recording, capture is stopped and
    /// nothing is written to history.
    pub async fn cancel_record(&self) -> CancelOutcome {
        let config = self.config.get();

        let (phase, capture_ready) = {
            let mut state = self.lock();
            let phase = state.phase;
            let capture_ready = state.capture_ready;
            match phase {
                RecordingPhase::Idle => return CancelOutcome::Nothing,
                RecordingPhase::Transcribing => {
                    let cycle = state.cycle;
                    state.discarded.insert(cycle);
                }
                RecordingPhase::Recording => {}
            }
            state.reset_to_idle();
            self.publish(&state);
            (phase, capture_ready)
        };

        match phase {
            RecordingPhase::Transcribing => {
                if let Err(e) = self.host.cancel_transcription().await {
                    log::warn!("Failed to cancel transcription: {e}");
                }
                self.toasts.show("Cancelled");
                log::info!("Transcription cancelled");
                CancelOutcome::TranscriptionCancelled
            }
            _ => {
                if config.sound_enabled {
                    self.play(SoundCue::End).await;
                }
                // An unfinished start releases the device itself
                if capture_ready {
                    if let Err(e) = self.host.stop_recording().await {
                        log::warn!("Stop after cancel failed: {e}");
                    }
                }
                log::info!("Recording cancelled");
                CancelOutcome::RecordingDiscarded
            }
        }
    }

    /// Stop if recording, otherwise start
    pub async fn toggle_record(&self) -> Result<Toggled, RecordingError> {
        log::debug!("Toggle, phase: {}", self.phase());
        if self.phase() == RecordingPhase::Recording {
            Ok(Toggled::Stopped(self.stop_record().await))
        } else {
            Ok(Toggled::Started(self.start_record().await?))
        }
    }

    pub(super) async fn play(&self, cue: SoundCue) {
        if let Err(e) = self.host.play_sound(cue).await {
            log::debug!("Sound {cue:?} failed: {e}");
        }
    }
}
