//! Scripted fakes for the host and hotkey seams.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::error::CommandError;
use crate::host::{NativeHost, SoundCue, SrtRequest, SystemStats};
use crate::recording::Coordinator;
use crate::shortcuts::{HotkeyRegistrar, ShortcutHandler};
use crate::store::{ConfigStore, HistoryStore, KeyValueStore, MemoryStore, SrtConfigStore};
use crate::toast::Toasts;

type Gate = Mutex<Option<oneshot::Receiver<()>>>;

async fn pass(gate: &Gate) {
    let rx = gate.lock().unwrap().take();
    if let Some(rx) = rx {
        let _ = rx.await;
    }
}

fn arm(gate: &Gate) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    *gate.lock().unwrap() = Some(rx);
    tx
}

/// Records every call as a string such as `transcribe_local:Tiny` and answers
/// from scripted results.
pub struct FakeHost {
    calls: Mutex<Vec<String>>,
    start_error: Mutex<Option<CommandError>>,
    stop_result: Mutex<Result<PathBuf, CommandError>>,
    transcription: Mutex<Result<String, CommandError>>,
    local_requests: Mutex<Vec<(PathBuf, String, bool, bool)>>,
    srt_requests: Mutex<Vec<SrtRequest>>,
    clipboard: Mutex<Option<String>>,
    paste_failures: Mutex<usize>,
    notifications: Mutex<Vec<(String, String)>>,
    models: Mutex<HashSet<String>>,
    keep_on_delete: Mutex<bool>,
    distro: Mutex<Result<String, CommandError>>,
    session: Mutex<Result<String, CommandError>>,
    autostart: Mutex<bool>,
    start_gate: Gate,
    transcription_gate: Gate,
    download_gate: Gate,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            start_error: Mutex::new(None),
            stop_result: Mutex::new(Ok(PathBuf::from("/tmp/capture.wav"))),
            transcription: Mutex::new(Ok("hello world".into())),
            local_requests: Mutex::new(Vec::new()),
            srt_requests: Mutex::new(Vec::new()),
            clipboard: Mutex::new(None),
            paste_failures: Mutex::new(0),
            notifications: Mutex::new(Vec::new()),
            models: Mutex::new(HashSet::new()),
            keep_on_delete: Mutex::new(false),
            distro: Mutex::new(Ok("ubuntu".into())),
            session: Mutex::new(Ok("x11".into())),
            autostart: Mutex::new(false),
            start_gate: Mutex::new(None),
            transcription_gate: Mutex::new(None),
            download_gate: Mutex::new(None),
        }
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn fail_start(&self, message: &str) {
        *self.start_error.lock().unwrap() = Some(CommandError::new(message));
    }

    pub fn set_stop(&self, result: Result<PathBuf, CommandError>) {
        *self.stop_result.lock().unwrap() = result;
    }

    /// Result of every transcription call, cloud or local
    pub fn set_transcription(&self, result: Result<String, CommandError>) {
        *self.transcription.lock().unwrap() = result;
    }

    /// The next `start_recording` waits until the returned sender fires
    pub fn hold_start(&self) -> oneshot::Sender<()> {
        arm(&self.start_gate)
    }

    /// The next transcription or SRT call waits until the returned sender fires
    pub fn hold_transcription(&self) -> oneshot::Sender<()> {
        arm(&self.transcription_gate)
    }

    pub fn hold_download(&self) -> oneshot::Sender<()> {
        arm(&self.download_gate)
    }

    /// (path, model, use_gpu, translate) of each local transcription
    pub fn local_requests(&self) -> Vec<(PathBuf, String, bool, bool)> {
        self.local_requests.lock().unwrap().clone()
    }

    pub fn srt_requests(&self) -> Vec<SrtRequest> {
        self.srt_requests.lock().unwrap().clone()
    }

    pub fn clipboard(&self) -> Option<String> {
        self.clipboard.lock().unwrap().clone()
    }

    /// Fail the next `n` paste attempts
    pub fn fail_paste(&self, n: usize) {
        *self.paste_failures.lock().unwrap() = n;
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn install_model(&self, name: &str) {
        self.models.lock().unwrap().insert(name.to_string());
    }

    /// Deletion "succeeds" but leaves the file behind
    pub fn keep_models_on_delete(&self, keep: bool) {
        *self.keep_on_delete.lock().unwrap() = keep;
    }

    pub fn set_distro(&self, result: Result<String, CommandError>) {
        *self.distro.lock().unwrap() = result;
    }

    pub fn set_session(&self, result: Result<String, CommandError>) {
        *self.session.lock().unwrap() = result;
    }

    pub fn set_autostart_state(&self, enabled: bool) {
        *self.autostart.lock().unwrap() = enabled;
    }

    pub fn autostart_state(&self) -> bool {
        *self.autostart.lock().unwrap()
    }

    fn transcription_result(&self) -> Result<String, CommandError> {
        self.transcription.lock().unwrap().clone()
    }
}

#[async_trait]
impl NativeHost for FakeHost {
    async fn start_recording(&self) -> Result<(), CommandError> {
        self.log("start_recording");
        pass(&self.start_gate).await;
        match self.start_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn stop_recording(&self) -> Result<PathBuf, CommandError> {
        self.log("stop_recording");
        self.stop_result.lock().unwrap().clone()
    }

    async fn transcribe(&self, _path: &Path, token: &str, user_agent: &str) -> Result<String, CommandError> {
        self.log(format!("transcribe:{token}:{user_agent}"));
        pass(&self.transcription_gate).await;
        self.transcription_result()
    }

    async fn transcribe_local(
        &self,
        path: &Path,
        model: &str,
        use_gpu: bool,
        translate: bool,
    ) -> Result<String, CommandError> {
        self.log(format!("transcribe_local:{model}"));
        self.local_requests
            .lock()
            .unwrap()
            .push((path.to_path_buf(), model.to_string(), use_gpu, translate));
        pass(&self.transcription_gate).await;
        self.transcription_result()
    }

    async fn generate_srt(&self, request: &SrtRequest) -> Result<PathBuf, CommandError> {
        self.log("generate_srt");
        self.srt_requests.lock().unwrap().push(request.clone());
        pass(&self.transcription_gate).await;
        Ok(request.output_path.clone())
    }

    async fn cancel_transcription(&self) -> Result<(), CommandError> {
        self.log("cancel_transcription");
        Ok(())
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), CommandError> {
        self.log("write_clipboard");
        *self.clipboard.lock().unwrap() = Some(text.to_string());
        Ok(())
    }

    async fn paste_text(&self) -> Result<(), CommandError> {
        self.log("paste_text");
        let mut failures = self.paste_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(CommandError::new("no focused window"));
        }
        Ok(())
    }

    async fn send_notification(&self, title: &str, body: &str) -> Result<(), CommandError> {
        self.log("send_notification");
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }

    async fn play_sound(&self, cue: SoundCue) -> Result<(), CommandError> {
        let name = match cue {
            SoundCue::Start => "start",
            SoundCue::End => "end",
        };
        self.log(format!("play_sound:{name}"));
        Ok(())
    }

    async fn open_link(&self, url: &str) -> Result<(), CommandError> {
        self.log(format!("open_link:{url}"));
        Ok(())
    }

    async fn check_model_exists(&self, model: &str) -> Result<bool, CommandError> {
        self.log(format!("check_model_exists:{model}"));
        Ok(self.models.lock().unwrap().contains(model))
    }

    async fn download_model(&self, model: &str) -> Result<(), CommandError> {
        self.log(format!("download_model:{model}"));
        pass(&self.download_gate).await;
        self.install_model(model);
        Ok(())
    }

    async fn cancel_download(&self, model: &str) -> Result<(), CommandError> {
        self.log(format!("cancel_download:{model}"));
        Ok(())
    }

    async fn delete_model(&self, model: &str) -> Result<(), CommandError> {
        self.log(format!("delete_model:{model}"));
        if !*self.keep_on_delete.lock().unwrap() {
            self.models.lock().unwrap().remove(model);
        }
        Ok(())
    }

    async fn get_system_stats(&self) -> Result<SystemStats, CommandError> {
        self.log("get_system_stats");
        Ok(SystemStats {
            total_memory: 16 * 1024 * 1024 * 1024,
            free_memory: 8 * 1024 * 1024 * 1024,
            cpu_cores: 8,
            has_nvidia: false,
            has_amd: false,
            backend: "CPU".into(),
        })
    }

    async fn get_linux_distro(&self) -> Result<String, CommandError> {
        self.log("get_linux_distro");
        self.distro.lock().unwrap().clone()
    }

    async fn get_session_type(&self) -> Result<String, CommandError> {
        self.log("get_session_type");
        self.session.lock().unwrap().clone()
    }

    async fn is_autostart_enabled(&self) -> Result<bool, CommandError> {
        self.log("is_autostart_enabled");
        Ok(self.autostart_state())
    }

    async fn set_autostart(&self, enabled: bool) -> Result<(), CommandError> {
        self.log(format!("set_autostart:{enabled}"));
        self.set_autostart_state(enabled);
        Ok(())
    }
}

#[derive(Default)]
struct RegistrarState {
    registered: HashSet<String>,
    register_calls: Vec<String>,
    unregister_calls: Vec<String>,
    fail_unregister: bool,
    register_error: Option<CommandError>,
}

/// Hotkey registrar that keeps registrations in a set
#[derive(Default)]
pub struct FakeRegistrar {
    state: Mutex<RegistrarState>,
    register_gate: Gate,
}

impl FakeRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().register_calls.clone()
    }

    pub fn unregister_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().unregister_calls.clone()
    }

    pub fn is_active(&self, combo: &str) -> bool {
        self.state.lock().unwrap().registered.contains(combo)
    }

    /// Drop a registration behind the manager's back
    pub fn forget(&self, combo: &str) {
        self.state.lock().unwrap().registered.remove(combo);
    }

    pub fn fail_unregister(&self, fail: bool) {
        self.state.lock().unwrap().fail_unregister = fail;
    }

    pub fn fail_register_with(&self, message: &str) {
        self.state.lock().unwrap().register_error = Some(CommandError::new(message));
    }

    /// The next `register` waits until the returned sender fires
    pub fn hold_next_register(&self) -> oneshot::Sender<()> {
        arm(&self.register_gate)
    }
}

#[async_trait]
impl HotkeyRegistrar for FakeRegistrar {
    async fn register(&self, combo: &str) -> Result<(), CommandError> {
        self.state.lock().unwrap().register_calls.push(combo.to_string());
        pass(&self.register_gate).await;

        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.register_error.clone() {
            return Err(e);
        }
        state.registered.insert(combo.to_string());
        Ok(())
    }

    async fn unregister(&self, combo: &str) -> Result<(), CommandError> {
        let mut state = self.state.lock().unwrap();
        state.unregister_calls.push(combo.to_string());
        state.registered.remove(combo);
        if state.fail_unregister {
            return Err(CommandError::new("unregister failed"));
        }
        Ok(())
    }

    async fn is_registered(&self, combo: &str) -> Result<bool, CommandError> {
        Ok(self.state.lock().unwrap().registered.contains(combo))
    }
}

/// Shortcut handler that only remembers what fired
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingHandler {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl ShortcutHandler for RecordingHandler {
    fn on_toggle(&self) {
        self.calls.lock().unwrap().push("toggle");
    }

    fn on_press(&self) {
        self.calls.lock().unwrap().push("press");
    }

    fn on_release(&self) {
        self.calls.lock().unwrap().push("release");
    }
}

/// Local engine, Tiny model, sounds on, no auto-paste
pub fn local_config() -> Value {
    json!({
        "transcriptionEngine": "local",
        "localModel": "Tiny",
        "soundEnabled": true,
        "autoCopy": true,
        "autoPaste": false,
    })
}

/// Settings blob → in-memory stores → coordinator writing subtitles to `/outputs`.
/// The blob may carry `srtConfig` and `history` like the real settings file.
pub async fn coordinator_with(host: &Arc<FakeHost>, settings: Value) -> (Coordinator, Arc<HistoryStore>) {
    let entries = match settings {
        Value::Object(map) => map,
        _ => Default::default(),
    };
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_entries(entries));
    let config = Arc::new(ConfigStore::load(store.clone()).await.unwrap());
    let srt = Arc::new(SrtConfigStore::load(store.clone()).await.unwrap());
    let history = Arc::new(HistoryStore::load(store).await.unwrap());
    let coordinator = Coordinator::new(host.clone(), config, srt, history.clone(), Toasts::new())
        .with_output_dir("/outputs");
    (coordinator, history)
}
