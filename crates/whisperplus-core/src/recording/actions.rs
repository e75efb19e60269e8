//! Recording Action Queue
//!
//! Hotkey callbacks and IPC toggles are synchronous and may fire faster than
//! the host answers. They push actions here; a single worker applies them in
//! order, so a quick hold-mode press/release never runs stop before start.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Coordinator, RecordingPhase};
use crate::shortcuts::ShortcutHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingAction {
    Toggle,
    Start,
    Stop,
}

/// Cheap handle for queueing actions. Also the hotkey handler.
#[derive(Debug, Clone)]
pub struct ActionSender {
    tx: mpsc::UnboundedSender<RecordingAction>,
}

impl ActionSender {
    /// Sender plus the raw receiving end, for consumers other than the worker
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RecordingAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the worker has shut down
    pub fn send(&self, action: RecordingAction) -> bool {
        match self.tx.send(action) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("Recording worker is gone, dropping {action:?}");
                false
            }
        }
    }
}

impl ShortcutHandler for ActionSender {
    fn on_toggle(&self) {
        self.send(RecordingAction::Toggle);
    }

    fn on_press(&self) {
        self.send(RecordingAction::Start);
    }

    fn on_release(&self) {
        self.send(RecordingAction::Stop);
    }
}

/// Spawn the worker draining the queue. It ends when every sender is dropped.
pub fn spawn_action_worker(coordinator: Arc<Coordinator>) -> (ActionSender, JoinHandle<()>) {
    let (sender, mut rx) = ActionSender::channel();

    let handle = tokio::spawn(async move {
        while let Some(action) = rx.recv().await {
            log::debug!("Recording action: {action:?}");
            let stop = match action {
                RecordingAction::Start => false,
                RecordingAction::Stop => true,
                RecordingAction::Toggle => coordinator.phase() == RecordingPhase::Recording,
            };

            if stop {
                // The phase flips now; the slow half runs off the queue
                if let Some(ticket) = coordinator.begin_stop() {
                    let coordinator = coordinator.clone();
                    tokio::spawn(async move {
                        coordinator.finish_stop(ticket).await;
                    });
                }
            } else if let Err(e) = coordinator.start_record().await {
                log::warn!("Start from {action:?} rejected: {e}");
            }
        }
        log::debug!("Recording action worker stopped");
    });

    (sender, handle)
}
