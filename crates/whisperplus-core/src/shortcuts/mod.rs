//! Global shortcut management
//!
//! One OS-level hotkey at a time. The registrar talks to the platform; this
//! module decides when to (re)register and routes press/release events to the
//! handler for the active mode.

mod capability;

pub use capability::{Capabilities, SessionType, TOGGLE_COMMAND};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::RecordMode;
use crate::error::{CommandError, ShortcutError};

/// Platform hotkey registration, e.g. the desktop shell's global-shortcut plugin
#[async_trait]
pub trait HotkeyRegistrar: Send + Sync {
    async fn register(&self, combo: &str) -> Result<(), CommandError>;

    async fn unregister(&self, combo: &str) -> Result<(), CommandError>;

    async fn is_registered(&self, combo: &str) -> Result<bool, CommandError>;
}

/// Callbacks fired by the hotkey. Must not block.
pub trait ShortcutHandler: Send + Sync {
    /// Pressed, in toggle mode
    fn on_toggle(&self);

    /// Pressed, in hold mode
    fn on_press(&self);

    /// Released, in hold mode
    fn on_release(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutState {
    Pressed,
    Released,
}

/// Result of an `enable`/`disable` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutStatus {
    /// A registration call was made and succeeded
    Registered,
    /// The combo was already registered and still is
    AlreadyActive,
    /// Empty combo: nothing is registered
    NoShortcut,
    Disabled,
    /// Another enable/disable was in flight; this call did nothing
    Dropped,
}

struct ActiveShortcut {
    combo: String,
    mode: RecordMode,
    handler: Arc<dyn ShortcutHandler>,
}

pub struct ShortcutManager {
    registrar: Arc<dyn HotkeyRegistrar>,
    capabilities: Capabilities,
    active: Mutex<Option<ActiveShortcut>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an enable/disable call finishes
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ShortcutManager {
    pub fn new(registrar: Arc<dyn HotkeyRegistrar>, capabilities: Capabilities) -> Self {
        Self {
            registrar,
            capabilities,
            active: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Registered combo, if any
    pub fn current_combo(&self) -> Option<String> {
        self.lock().as_ref().map(|a| a.combo.clone())
    }

    pub fn current_mode(&self) -> Option<RecordMode> {
        self.lock().as_ref().map(|a| a.mode)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveShortcut>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_begin(&self) -> Option<InFlight<'_>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(InFlight(&self.in_flight))
        }
    }

    /// Register `combo` and route its events to `handler` according to `mode`.
    ///
    /// Calling again with a combo that is still registered makes no
    /// registration call; the mode and handler are simply swapped in.
    pub async fn enable(
        &self,
        mode: RecordMode,
        handler: Arc<dyn ShortcutHandler>,
        combo: &str,
    ) -> Result<ShortcutStatus, ShortcutError> {
        let Some(_in_flight) = self.try_begin() else {
            log::debug!("Shortcut update already in progress, dropping enable({combo})");
            return Ok(ShortcutStatus::Dropped);
        };

        if mode == RecordMode::Hold && !self.capabilities.hold_mode_supported() {
            return Err(ShortcutError::HoldModeUnsupported {
                session: self.capabilities.session.to_string(),
            });
        }

        let combo = combo.trim();
        let previous = self.current_combo();

        if combo.is_empty() {
            if let Some(old) = previous {
                self.unregister_quietly(&old).await;
            }
            *self.lock() = None;
            return Ok(ShortcutStatus::NoShortcut);
        }

        if previous.as_deref() == Some(combo) {
            // The registration may have been dropped behind our back
            let still_registered = match self.registrar.is_registered(combo).await {
                Ok(registered) => registered,
                Err(e) => {
                    log::warn!("Could not query shortcut state for {combo}: {e}");
                    true
                }
            };
            if still_registered {
                self.set_active(combo, mode, handler);
                return Ok(ShortcutStatus::AlreadyActive);
            }
            log::info!("Shortcut {combo} was unregistered externally, registering again");
        } else if let Some(old) = previous {
            self.unregister_quietly(&old).await;
            *self.lock() = None;
        }

        match self.registrar.register(combo).await {
            Ok(()) => {
                log::info!("Global shortcut registered: {combo} ({mode})");
            }
            Err(e) if e.is_already_registered() => {
                log::info!("Global shortcut {combo} was already registered, reusing it");
            }
            Err(e) => {
                *self.lock() = None;
                return Err(ShortcutError::Registration {
                    combo: combo.to_string(),
                    source: e,
                });
            }
        }
        self.set_active(combo, mode, handler);
        Ok(ShortcutStatus::Registered)
    }

    /// Unregister the current combo, if any
    pub async fn disable(&self) -> ShortcutStatus {
        let Some(_in_flight) = self.try_begin() else {
            log::debug!("Shortcut update already in progress, dropping disable()");
            return ShortcutStatus::Dropped;
        };

        let previous = self.lock().take();
        if let Some(active) = previous {
            self.unregister_quietly(&active.combo).await;
            log::info!("Global shortcut disabled: {}", active.combo);
        }
        ShortcutStatus::Disabled
    }

    /// Route a hotkey event from the platform to the active handler
    pub fn dispatch(&self, state: ShortcutState) {
        let (mode, handler) = match self.lock().as_ref() {
            Some(active) => (active.mode, active.handler.clone()),
            None => return,
        };

        match (mode, state) {
            (RecordMode::Toggle, ShortcutState::Pressed) => handler.on_toggle(),
            (RecordMode::Toggle, ShortcutState::Released) => {}
            (RecordMode::Hold, ShortcutState::Pressed) => handler.on_press(),
            (RecordMode::Hold, ShortcutState::Released) => handler.on_release(),
        }
    }

    fn set_active(&self, combo: &str, mode: RecordMode, handler: Arc<dyn ShortcutHandler>) {
        *self.lock() = Some(ActiveShortcut {
            combo: combo.to_string(),
            mode,
            handler,
        });
    }

    async fn unregister_quietly(&self, combo: &str) {
        if let Err(e) = self.registrar.unregister(combo).await {
            log::debug!("Ignoring unregister failure for {combo}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRegistrar, RecordingHandler};

    fn manager(registrar: &Arc<FakeRegistrar>, session: SessionType) -> ShortcutManager {
        ShortcutManager::new(registrar.clone(), Capabilities::for_session(session))
    }

    #[tokio::test]
    async fn enabling_twice_registers_once() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::X11);
        let handler = Arc::new(RecordingHandler::default());

        let first = shortcuts
            .enable(RecordMode::Toggle, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        let second = shortcuts
            .enable(RecordMode::Toggle, handler, "Ctrl+Alt+Space")
            .await
            .unwrap();

        assert_eq!(first, ShortcutStatus::Registered);
        assert_eq!(second, ShortcutStatus::AlreadyActive);
        assert_eq!(registrar.register_calls(), vec!["Ctrl+Alt+Space".to_string()]);
    }

    #[tokio::test]
    async fn re_registers_when_dropped_externally() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::X11);
        let handler = Arc::new(RecordingHandler::default());

        shortcuts
            .enable(RecordMode::Toggle, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        registrar.forget("Ctrl+Alt+Space");

        let status = shortcuts
            .enable(RecordMode::Toggle, handler, "Ctrl+Alt+Space")
            .await
            .unwrap();
        assert_eq!(status, ShortcutStatus::Registered);
        assert_eq!(registrar.register_calls().len(), 2);
    }

    #[tokio::test]
    async fn changing_combo_unregisters_old_even_if_that_fails() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::X11);
        let handler = Arc::new(RecordingHandler::default());

        shortcuts
            .enable(RecordMode::Toggle, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        registrar.fail_unregister(true);

        shortcuts
            .enable(RecordMode::Toggle, handler, "Super+R")
            .await
            .unwrap();

        assert_eq!(registrar.unregister_calls(), vec!["Ctrl+Alt+Space".to_string()]);
        assert_eq!(shortcuts.current_combo().as_deref(), Some("Super+R"));
    }

    #[tokio::test]
    async fn already_registered_counts_as_success() {
        let registrar = Arc::new(FakeRegistrar::new());
        registrar.fail_register_with("HotKey already registered");
        let shortcuts = manager(&registrar, SessionType::X11);

        let status = shortcuts
            .enable(RecordMode::Toggle, Arc::new(RecordingHandler::default()), "Ctrl+Alt+Space")
            .await
            .unwrap();
        assert_eq!(status, ShortcutStatus::Registered);
        assert_eq!(shortcuts.current_combo().as_deref(), Some("Ctrl+Alt+Space"));
    }

    #[tokio::test]
    async fn other_registration_failures_leave_nothing_active() {
        let registrar = Arc::new(FakeRegistrar::new());
        registrar.fail_register_with("invalid accelerator");
        let shortcuts = manager(&registrar, SessionType::X11);

        let err = shortcuts
            .enable(RecordMode::Toggle, Arc::new(RecordingHandler::default()), "Ctrl+Nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ShortcutError::Registration { .. }));
        assert!(shortcuts.current_combo().is_none());
    }

    #[tokio::test]
    async fn hold_mode_is_rejected_on_wayland() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::Wayland);

        let err = shortcuts
            .enable(RecordMode::Hold, Arc::new(RecordingHandler::default()), "Ctrl+Alt+Space")
            .await
            .unwrap_err();
        assert!(matches!(err, ShortcutError::HoldModeUnsupported { .. }));
        assert!(registrar.register_calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_follows_mode() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::X11);
        let handler = Arc::new(RecordingHandler::default());

        shortcuts
            .enable(RecordMode::Toggle, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        shortcuts.dispatch(ShortcutState::Pressed);
        shortcuts.dispatch(ShortcutState::Released);
        assert_eq!(handler.calls(), vec!["toggle"]);

        shortcuts
            .enable(RecordMode::Hold, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        shortcuts.dispatch(ShortcutState::Pressed);
        shortcuts.dispatch(ShortcutState::Released);
        assert_eq!(handler.calls(), vec!["toggle", "press", "release"]);
    }

    #[tokio::test]
    async fn disable_is_idempotent() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::X11);
        let handler = Arc::new(RecordingHandler::default());

        shortcuts
            .enable(RecordMode::Toggle, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        assert_eq!(shortcuts.disable().await, ShortcutStatus::Disabled);
        assert_eq!(shortcuts.disable().await, ShortcutStatus::Disabled);
        assert_eq!(registrar.unregister_calls().len(), 1);

        shortcuts.dispatch(ShortcutState::Pressed);
        assert!(handler.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_combo_clears_registration() {
        let registrar = Arc::new(FakeRegistrar::new());
        let shortcuts = manager(&registrar, SessionType::X11);
        let handler = Arc::new(RecordingHandler::default());

        shortcuts
            .enable(RecordMode::Toggle, handler.clone(), "Ctrl+Alt+Space")
            .await
            .unwrap();
        let status = shortcuts.enable(RecordMode::Toggle, handler, "  ").await.unwrap();
        assert_eq!(status, ShortcutStatus::NoShortcut);
        assert!(shortcuts.current_combo().is_none());
        assert_eq!(registrar.unregister_calls().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_calls_are_dropped() {
        let registrar = Arc::new(FakeRegistrar::new());
        let gate = registrar.hold_next_register();
        let shortcuts = Arc::new(manager(&registrar, SessionType::X11));
        let handler: Arc<dyn ShortcutHandler> = Arc::new(RecordingHandler::default());

        let first = tokio::spawn({
            let shortcuts = shortcuts.clone();
            let handler = handler.clone();
            async move {
                shortcuts
                    .enable(RecordMode::Toggle, handler, "Ctrl+Alt+Space")
                    .await
            }
        });
        // Let the first call reach the registrar
        while registrar.register_calls().is_empty() {
            tokio::task::yield_now().await;
        }

        let second = shortcuts
            .enable(RecordMode::Toggle, handler, "Super+R")
            .await
            .unwrap();
        assert_eq!(second, ShortcutStatus::Dropped);
        assert_eq!(shortcuts.disable().await, ShortcutStatus::Dropped);

        let _ = gate.send(());
        assert_eq!(first.await.unwrap().unwrap(), ShortcutStatus::Registered);
        assert_eq!(registrar.register_calls(), vec!["Ctrl+Alt+Space".to_string()]);
    }
}
