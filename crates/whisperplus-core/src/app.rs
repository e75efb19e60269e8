//! Application composition root
//!
//! Wires the stores, the coordinator, the shortcut manager and the model
//! manager together at startup, and applies the cross-cutting rules of
//! settings changes (capability guards, shortcut re-registration, autostart).

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::RecordMode;
use crate::error::{SettingsError, ShortcutError, StoreError};
use crate::host::{HostEvent, NativeHost};
use crate::models::ModelManager;
use crate::recording::{ActionSender, Coordinator, RecordingAction, spawn_action_worker};
use crate::settings::{AppConfig, keys};
use crate::shortcuts::{
    Capabilities, HotkeyRegistrar, ShortcutHandler, ShortcutManager, ShortcutState, ShortcutStatus,
};
use crate::store::{ConfigStore, HistoryStore, KeyValueStore, SrtConfigStore};
use crate::toast::Toasts;

#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Where subtitles go when no other location applies
    pub output_dir: Option<PathBuf>,
    /// Listen for `whisperplus toggle` on this socket, usually
    /// [`ipc::socket_path`](crate::ipc::socket_path). `None` leaves IPC off.
    pub ipc_socket: Option<PathBuf>,
}

pub struct App {
    host: Arc<dyn NativeHost>,
    config: Arc<ConfigStore>,
    srt: Arc<SrtConfigStore>,
    history: Arc<HistoryStore>,
    toasts: Toasts,
    coordinator: Arc<Coordinator>,
    shortcuts: ShortcutManager,
    models: ModelManager,
    actions: ActionSender,
    worker: JoinHandle<()>,
    #[cfg(unix)]
    _ipc: Option<crate::ipc::IpcServer>,
}

impl App {
    /// Load every store, detect session capabilities, start the action
    /// worker and register the configured shortcut.
    pub async fn start(
        host: Arc<dyn NativeHost>,
        registrar: Arc<dyn HotkeyRegistrar>,
        store: Arc<dyn KeyValueStore>,
        options: AppOptions,
    ) -> Result<Self, StoreError> {
        let config = Arc::new(ConfigStore::load(store.clone()).await?);
        let srt = Arc::new(SrtConfigStore::load(store.clone()).await?);
        let history = Arc::new(HistoryStore::load(store).await?);
        let toasts = Toasts::new();

        config.refresh_autostart(host.as_ref()).await;
        let capabilities = Capabilities::detect(host.as_ref()).await;

        let mut coordinator = Coordinator::new(
            host.clone(),
            config.clone(),
            srt.clone(),
            history.clone(),
            toasts.clone(),
        );
        if let Some(dir) = options.output_dir {
            coordinator = coordinator.with_output_dir(dir);
        }
        let coordinator = Arc::new(coordinator);
        let (actions, worker) = spawn_action_worker(coordinator.clone());

        #[cfg(unix)]
        let ipc = options.ipc_socket.and_then(|path| {
            crate::ipc::IpcServer::bind(&path, actions.clone())
                .map_err(|e| log::error!("Failed to create IPC socket {}: {e}", path.display()))
                .ok()
        });
        #[cfg(not(unix))]
        let _ = options
            .ipc_socket
            .map(|_| log::warn!("IPC toggle is not available on this platform"));

        let app = Self {
            models: ModelManager::new(host.clone(), config.clone(), toasts.clone()),
            shortcuts: ShortcutManager::new(registrar, capabilities),
            host,
            config,
            srt,
            history,
            toasts,
            coordinator,
            actions,
            worker,
            #[cfg(unix)]
            _ipc: ipc,
        };

        if let Err(e) = app.apply_shortcut().await {
            app.report_shortcut_error(&e);
        }
        log::info!("Whisper+ core started");
        Ok(app)
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn srt_config(&self) -> &Arc<SrtConfigStore> {
        &self.srt
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn shortcuts(&self) -> &ShortcutManager {
        &self.shortcuts
    }

    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.shortcuts.capabilities()
    }

    /// Queue a recording action, as the record button does
    pub fn send(&self, action: RecordingAction) -> bool {
        self.actions.send(action)
    }

    /// Forward a hotkey event from the platform
    pub fn on_shortcut(&self, state: ShortcutState) {
        self.shortcuts.dispatch(state);
    }

    /// Register or drop the hotkey to match the current settings.
    ///
    /// A stored hold mode that the session cannot deliver is registered as
    /// toggle so the hotkey still does something.
    pub async fn apply_shortcut(&self) -> Result<ShortcutStatus, ShortcutError> {
        let config = self.config.get();
        if !config.shortcut_enabled {
            return Ok(self.shortcuts.disable().await);
        }

        let mut mode = config.record_mode;
        if mode == RecordMode::Hold && !self.capabilities().hold_mode_supported() {
            log::warn!("Hold mode unavailable in this session, registering as toggle");
            if let Some(notice) = self.capabilities().hold_mode_notice() {
                self.toasts.show(notice);
            }
            mode = RecordMode::Toggle;
        }

        let handler: Arc<dyn ShortcutHandler> = Arc::new(self.actions.clone());
        self.shortcuts
            .enable(mode, handler, &config.global_shortcut)
            .await
    }

    /// Change one setting by key.
    ///
    /// `autostart` goes to the host instead of the settings file. Options
    /// the session cannot support are refused before anything is written.
    /// A shortcut that fails to register does not undo the saved setting.
    pub async fn update_setting(&self, key: &str, value: Value) -> Result<AppConfig, SettingsError> {
        if key == keys::AUTOSTART {
            let enabled = value.as_bool().ok_or_else(|| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a boolean, got {value}"),
            })?;
            self.config.set_autostart(self.host.as_ref(), enabled).await?;
            return Ok(self.config.get());
        }

        if key == keys::RECORD_MODE && value.as_str() == Some(RecordMode::Hold.as_str()) {
            if let Some(notice) = self.capabilities().hold_mode_notice() {
                return Err(SettingsError::Unsupported(notice.to_string()));
            }
        }

        let updated = self.config.update_setting(key, value).await?;

        if keys::SHORTCUT_AFFECTING.contains(&key) {
            if let Err(e) = self.apply_shortcut().await {
                self.report_shortcut_error(&e);
            }
        }
        Ok(updated)
    }

    /// Restore the behaviour toggles, turn autostart off and re-apply the shortcut
    pub async fn reset_defaults(&self) -> Result<AppConfig, SettingsError> {
        self.config.reset_defaults().await?;
        if let Err(e) = self.config.set_autostart(self.host.as_ref(), false).await {
            log::warn!("Could not disable autostart during reset: {e}");
        }
        if let Err(e) = self.apply_shortcut().await {
            self.report_shortcut_error(&e);
        }
        self.toasts.show("Settings Reset");
        Ok(self.config.get())
    }

    /// Route an event pushed by the host
    pub fn handle_event(&self, event: HostEvent) {
        log::debug!("Host event: {}", event.name());
        match event {
            HostEvent::DownloadProgress(progress) => self.models.on_progress(progress),
            HostEvent::TranscribeProgress(progress) => self.coordinator.on_transcribe_progress(progress),
            HostEvent::SrtProgress(progress) => self.coordinator.on_srt_progress(progress),
            HostEvent::CliToggle => {
                self.actions.send(RecordingAction::Toggle);
            }
        }
    }

    /// Release the hotkey and stop the action worker. Transcriptions already
    /// handed to the host still finish.
    pub async fn shutdown(self) {
        self.shortcuts.disable().await;
        let Self { actions, worker, .. } = self;
        drop(actions);
        worker.abort();
        log::info!("Whisper+ core stopped");
    }

    fn report_shortcut_error(&self, error: &ShortcutError) {
        log::error!("Shortcut setup failed: {error}");
        self.toasts.show(format!("Shortcut error: {error}"));
    }
}
