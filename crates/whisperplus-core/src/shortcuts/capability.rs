//! Session capability detection
//!
//! Some display servers restrict what a global hotkey can do:
//! - X11: press and release are both delivered, synthetic paste works everywhere
//! - Wayland: no key-release events, so hold mode cannot work; synthetic
//!   paste only reaches XWayland windows

use serde::Serialize;
use std::env;
use std::fmt;

use crate::host::NativeHost;

/// Toggle command users bind in their compositor when global hotkeys are unavailable
pub const TOGGLE_COMMAND: &str = "whisperplus toggle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    X11,
    Wayland,
    Unknown,
}

impl SessionType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "x11" | "xorg" => SessionType::X11,
            "wayland" => SessionType::Wayland,
            _ => SessionType::Unknown,
        }
    }

    /// Classify from `XDG_SESSION_TYPE` and `WAYLAND_DISPLAY` values
    pub fn from_vars(session_type: Option<&str>, wayland_display: Option<&str>) -> Self {
        match session_type.map(Self::parse) {
            Some(SessionType::Unknown) | None => {}
            Some(known) => return known,
        }
        if wayland_display.is_some_and(|d| !d.is_empty()) {
            SessionType::Wayland
        } else if session_type.is_some() {
            SessionType::Unknown
        } else {
            SessionType::X11
        }
    }

    pub fn from_env() -> Self {
        let session_type = env::var("XDG_SESSION_TYPE").ok();
        let wayland_display = env::var("WAYLAND_DISPLAY").ok();
        Self::from_vars(session_type.as_deref(), wayland_display.as_deref())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::X11 => "x11",
            SessionType::Wayland => "wayland",
            SessionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the current session lets the shortcut and paste features do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub session: SessionType,
    pub compositor: String,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::for_session(SessionType::X11)
    }
}

impl Capabilities {
    pub fn for_session(session: SessionType) -> Self {
        Self {
            session,
            compositor: detect_compositor(),
        }
    }

    /// Ask the host first, fall back to the environment
    pub async fn detect(host: &dyn NativeHost) -> Self {
        let session = match host.get_session_type().await {
            Ok(value) => match SessionType::parse(&value) {
                SessionType::Unknown => SessionType::from_env(),
                known => known,
            },
            Err(e) => {
                log::warn!("Session type query failed, using environment: {e}");
                SessionType::from_env()
            }
        };
        let capabilities = Self::for_session(session);
        log::info!(
            "Session: {} (compositor: {})",
            capabilities.session,
            capabilities.compositor
        );
        capabilities
    }

    /// Hold mode needs key-release events
    pub fn hold_mode_supported(&self) -> bool {
        self.session != SessionType::Wayland
    }

    pub fn auto_paste_limited(&self) -> bool {
        self.session == SessionType::Wayland
    }

    pub fn hold_mode_notice(&self) -> Option<&'static str> {
        (!self.hold_mode_supported())
            .then_some("Hold mode is unavailable on Wayland: key releases are not delivered. Use toggle mode.")
    }

    pub fn auto_paste_notice(&self) -> Option<&'static str> {
        self.auto_paste_limited()
            .then_some("Auto-paste on Wayland only reaches XWayland applications. The text is still copied.")
    }

    /// Steps for binding the toggle command in the user's compositor
    pub fn manual_setup_instructions(&self, shortcut: &str) -> Vec<String> {
        let compositor = self.compositor.to_lowercase();
        match compositor.as_str() {
            c if c.contains("gnome") => vec![
                "GNOME: Settings → Keyboard → Custom Shortcuts".into(),
                "  Name: Whisper+ Toggle Recording".into(),
                format!("  Command: {TOGGLE_COMMAND}"),
                format!("  Shortcut: {shortcut}"),
            ],
            c if c.contains("kde") || c.contains("plasma") => vec![
                "KDE: System Settings → Shortcuts → Custom Shortcuts".into(),
                format!("  Command: {TOGGLE_COMMAND}"),
                format!("  Shortcut: {shortcut}"),
            ],
            c if c.contains("sway") => vec![
                "Sway: Add to ~/.config/sway/config:".into(),
                format!("  bindsym {} exec {TOGGLE_COMMAND}", shortcut.to_lowercase()),
            ],
            c if c.contains("hyprland") => vec![
                "Hyprland: Add to ~/.config/hypr/hyprland.conf:".into(),
                format!("  bind = {}, exec, {TOGGLE_COMMAND}", hyprland_keys(shortcut)),
            ],
            _ => vec![format!("Configure your compositor to run: {TOGGLE_COMMAND}")],
        }
    }
}

/// "Ctrl+Alt+Space" → "CTRL ALT, Space"
fn hyprland_keys(shortcut: &str) -> String {
    let mut parts: Vec<&str> = shortcut.split('+').map(str::trim).collect();
    let key = parts.pop().unwrap_or_default();
    let mods: Vec<String> = parts.iter().map(|m| m.to_uppercase()).collect();
    format!("{}, {key}", mods.join(" "))
}

fn detect_compositor() -> String {
    env::var("XDG_CURRENT_DESKTOP")
        .or_else(|_| env::var("DESKTOP_SESSION"))
        .unwrap_or_else(|_| "Unknown".into())
}
