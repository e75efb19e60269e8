//! Transient user-facing messages.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;

pub const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub message: String,
}

/// Single-slot toast. Showing a new toast replaces the current one, and each
/// toast's dismiss timer only hides the toast it was started for.
#[derive(Clone)]
pub struct Toasts {
    current: Arc<watch::Sender<Option<Toast>>>,
    counter: Arc<AtomicU64>,
    duration: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new()
    }
}

impl Toasts {
    pub fn new() -> Self {
        Self::with_duration(TOAST_DURATION)
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            current: Arc::new(watch::Sender::new(None)),
            counter: Arc::new(AtomicU64::new(0)),
            duration,
        }
    }

    pub fn show(&self, message: impl Into<String>) -> u64 {
        let id = self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let message = message.into();
        log::info!("Toast: {message}");
        self.current.send_replace(Some(Toast { id, message }));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let current = self.current.clone();
                let duration = self.duration;
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    current.send_if_modified(|toast| match toast {
                        Some(t) if t.id == id => {
                            *toast = None;
                            true
                        }
                        _ => false,
                    });
                });
            }
            Err(_) => log::debug!("No runtime, toast {id} will not auto-dismiss"),
        }
        id
    }

    pub fn hide(&self) {
        self.current.send_if_modified(|toast| toast.take().is_some());
    }

    pub fn current(&self) -> Option<Toast> {
        self.current.borrow().clone()
    }

    pub fn message(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|t| t.message.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Toast>> {
        self.current.subscribe()
    }
}
