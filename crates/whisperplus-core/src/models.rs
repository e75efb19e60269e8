//! Local model management
//!
//! Model files live on the host; this module tracks which downloads are in
//! flight, mirrors their progress and keeps the selected model and GPU flag
//! in the config store.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ModelError;
use crate::host::{DownloadProgress, NativeHost, SystemStats};
use crate::settings::{AppConfig, keys};
use crate::store::ConfigStore;
use crate::toast::Toasts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub name: &'static str,
    /// Approximate download size
    pub size: &'static str,
}

pub const MODELS: &[ModelInfo] = &[
    ModelInfo { name: "Tiny", size: "~75 MB" },
    ModelInfo { name: "Base", size: "~142 MB" },
    ModelInfo { name: "Small", size: "~466 MB" },
    ModelInfo { name: "Medium", size: "~1.5 GB" },
    ModelInfo { name: "Large", size: "~2.9 GB" },
];

/// Look up a catalogue entry, ignoring case
pub fn find_model(name: &str) -> Option<&'static ModelInfo> {
    let name = name.trim();
    MODELS.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub name: &'static str,
    pub size: &'static str,
    /// `None` when the host could not be asked
    pub installed: Option<bool>,
    pub selected: bool,
    pub downloading: bool,
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distro {
    Ubuntu,
    Fedora,
    Arch,
    Unknown,
}

impl Distro {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "ubuntu" => Distro::Ubuntu,
            "fedora" => Distro::Fedora,
            "arch" => Distro::Arch,
            _ => Distro::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpuVendor {
    Nvidia,
    Amd,
}

/// How to get GPU acceleration working on this machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpuHint {
    pub vendor: GpuVendor,
    pub title: &'static str,
    pub description: &'static str,
    /// Install command for the detected distro
    pub command: Option<&'static str>,
    /// Where to look when the distro is unknown
    pub link: Option<&'static str>,
}

const CUDA_DOWNLOADS: &str = "https://developer.nvidia.com/cuda-downloads";
const VULKAN_DOCS: &str = "https://vulkan.lunarg.com/sdk/home";

/// Setup hints for GPUs the local engine is not using yet. Empty when the
/// engine already runs on a GPU backend.
pub fn gpu_setup_hints(stats: &SystemStats, distro: Distro) -> Vec<GpuHint> {
    if stats.is_gpu_backend() {
        return Vec::new();
    }

    let mut hints = Vec::new();
    if stats.has_nvidia {
        let command = match distro {
            Distro::Ubuntu => Some("sudo apt install nvidia-cuda-toolkit"),
            Distro::Fedora => Some("sudo dnf install cuda"),
            Distro::Arch => Some("sudo pacman -S cuda"),
            Distro::Unknown => None,
        };
        hints.push(GpuHint {
            vendor: GpuVendor::Nvidia,
            title: "NVIDIA GPU Detected - Enable GPU Acceleration",
            description: "Install CUDA toolkit to enable GPU-accelerated transcription (10-50x faster)",
            command,
            link: command.is_none().then_some(CUDA_DOWNLOADS),
        });
    }
    if stats.has_amd {
        let command = match distro {
            Distro::Ubuntu => Some("sudo apt install mesa-vulkan-drivers vulkan-tools"),
            Distro::Fedora => Some("sudo dnf install vulkan mesa-vulkan-drivers"),
            Distro::Arch => Some("sudo pacman -S vulkan-icd-loader lib32-vulkan-icd-loader"),
            Distro::Unknown => None,
        };
        hints.push(GpuHint {
            vendor: GpuVendor::Amd,
            title: "AMD GPU Detected - Enable GPU Acceleration",
            description: "Install Vulkan drivers to enable GPU-accelerated transcription (5-20x faster)",
            command,
            link: command.is_none().then_some(VULKAN_DOCS),
        });
    }
    hints
}

#[derive(Debug)]
struct ActiveDownload {
    id: u64,
    progress: Option<f64>,
}

type Downloads = HashMap<&'static str, ActiveDownload>;

pub struct ModelManager {
    host: Arc<dyn NativeHost>,
    config: Arc<ConfigStore>,
    toasts: Toasts,
    downloads: Mutex<Downloads>,
    next_download: AtomicU64,
}

/// Forgets a download when its call returns, unless it was replaced meanwhile
struct DownloadSlot<'a> {
    manager: &'a ModelManager,
    name: &'static str,
    id: u64,
}

impl Drop for DownloadSlot<'_> {
    fn drop(&mut self) {
        let mut downloads = self.manager.lock();
        if downloads.get(self.name).is_some_and(|d| d.id == self.id) {
            downloads.remove(self.name);
        }
    }
}

impl ModelManager {
    pub fn new(host: Arc<dyn NativeHost>, config: Arc<ConfigStore>, toasts: Toasts) -> Self {
        Self {
            host,
            config,
            toasts,
            downloads: Mutex::new(HashMap::new()),
            next_download: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Downloads> {
        self.downloads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(name: &str) -> Result<&'static ModelInfo, ModelError> {
        find_model(name).ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    /// Every catalogue entry with its install and download state
    pub async fn statuses(&self) -> Vec<ModelStatus> {
        let selected = self.config.get().local_model;
        let mut statuses = Vec::with_capacity(MODELS.len());

        for model in MODELS {
            let installed = match self.host.check_model_exists(model.name).await {
                Ok(exists) => Some(exists),
                Err(e) => {
                    log::error!("Check {} failed: {e}", model.name);
                    None
                }
            };
            let (downloading, progress) = match self.lock().get(model.name) {
                Some(active) => (true, active.progress),
                None => (false, None),
            };
            statuses.push(ModelStatus {
                name: model.name,
                size: model.size,
                installed,
                selected: model.name.eq_ignore_ascii_case(selected.trim()),
                downloading,
                progress,
            });
        }
        statuses
    }

    /// Download a model. Only one download per model runs at a time.
    pub async fn download(&self, name: &str) -> Result<(), ModelError> {
        let model = Self::lookup(name)?;

        let id = {
            let mut downloads = self.lock();
            if downloads.contains_key(model.name) {
                drop(downloads);
                self.toasts.show("Download already in progress");
                return Err(ModelError::AlreadyDownloading(model.name.to_string()));
            }
            let id = self.next_download.fetch_add(1, Ordering::Relaxed);
            downloads.insert(model.name, ActiveDownload { id, progress: None });
            id
        };
        let _slot = DownloadSlot {
            manager: self,
            name: model.name,
            id,
        };

        log::info!("Downloading model {}", model.name);
        match self.host.download_model(model.name).await {
            Ok(()) => {
                log::info!("Model {} downloaded", model.name);
                self.toasts.show(format!("{} downloaded", model.name));
                Ok(())
            }
            Err(e) => {
                log::error!("Download of {} failed: {e}", model.name);
                self.toasts.show(format!("Download failed: {e}"));
                Err(e.into())
            }
        }
    }

    /// Ask the host to stop a download and forget it locally either way
    pub async fn cancel_download(&self, name: &str) -> Result<(), ModelError> {
        let model = Self::lookup(name)?;
        if let Err(e) = self.host.cancel_download(model.name).await {
            log::error!("Cancel download error: {e}");
        }
        self.lock().remove(model.name);
        self.toasts.show("Download cancelled");
        Ok(())
    }

    /// Delete a model file and check that it is really gone
    pub async fn delete(&self, name: &str) -> Result<(), ModelError> {
        let model = Self::lookup(name)?;

        if let Err(e) = self.host.delete_model(model.name).await {
            log::error!("Delete error: {e}");
            self.toasts.show(format!("Delete failed: {e}"));
            return Err(e.into());
        }
        self.toasts.show(format!("{} deleted", model.name));

        match self.host.check_model_exists(model.name).await {
            Ok(true) => {
                log::error!("Model deletion verification failed for {}", model.name);
                self.toasts.show("Warning: Model file may still exist");
                Err(ModelError::StillPresent(model.name.to_string()))
            }
            Ok(false) => Ok(()),
            Err(e) => {
                log::warn!("Could not verify deletion of {}: {e}", model.name);
                Ok(())
            }
        }
    }

    /// Make a catalogue model the local engine's model
    pub async fn select(&self, name: &str) -> Result<AppConfig, ModelError> {
        let model = Self::lookup(name)?;
        Ok(self.config.update_setting(keys::LOCAL_MODEL, json!(model.name)).await?)
    }

    /// Flip GPU use for the local engine; returns the new value
    pub async fn toggle_gpu(&self) -> Result<bool, ModelError> {
        let updated = self.config.update(|c| c.use_local_gpu = !c.use_local_gpu).await?;
        Ok(updated.use_local_gpu)
    }

    /// Apply a `download_progress` event. Progress for unknown or finished
    /// downloads is ignored.
    pub fn on_progress(&self, progress: DownloadProgress) {
        let Some(model) = find_model(&progress.model_name) else {
            log::debug!("Progress for unknown model {}", progress.model_name);
            return;
        };
        if let Some(active) = self.lock().get_mut(model.name) {
            active.progress = Some(progress.percentage.clamp(0.0, 100.0));
        }
    }

    /// Models currently downloading, with their last reported percentage
    pub fn active_downloads(&self) -> Vec<(&'static str, Option<f64>)> {
        let downloads = self.lock();
        MODELS
            .iter()
            .filter_map(|m| downloads.get(m.name).map(|d| (m.name, d.progress)))
            .collect()
    }

    /// Hardware summary plus the distro used for setup hints
    pub async fn system_info(&self) -> Result<(SystemStats, Distro), ModelError> {
        let stats = self.host.get_system_stats().await?;
        let distro = match self.host.get_linux_distro().await {
            Ok(name) => Distro::parse(&name),
            Err(e) => {
                log::debug!("Distro detection failed: {e}");
                Distro::Unknown
            }
        };
        Ok((stats, distro))
    }
}
