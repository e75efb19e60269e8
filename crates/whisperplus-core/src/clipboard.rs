//! Clipboard access for the CLI, outside the native host.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const FLATPAK_INFO: &str = "/.flatpak-info";

/// How text reaches the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    Arboard,
    /// The wl-copy bundled in the Flatpak. GNOME lacks wlr-data-control,
    /// which arboard needs on Wayland.
    WlCopy,
}

impl ClipboardTool {
    pub fn for_sandbox(in_flatpak: bool) -> Self {
        if in_flatpak {
            ClipboardTool::WlCopy
        } else {
            ClipboardTool::Arboard
        }
    }

    pub fn detect() -> Self {
        Self::for_sandbox(Path::new(FLATPAK_INFO).exists())
    }

    pub fn copy(self, text: &str) -> Result<()> {
        log::debug!("Copying {} chars with {self:?}", text.chars().count());
        match self {
            ClipboardTool::Arboard => {
                let mut clipboard = arboard::Clipboard::new().context("Failed to access clipboard")?;
                clipboard
                    .set_text(text)
                    .context("Failed to copy text to clipboard")
            }
            ClipboardTool::WlCopy => pipe_to("wl-copy", text),
        }
    }
}

fn pipe_to(program: &str, text: &str) -> Result<()> {
    let mut child = Command::new(program)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {program}"))?;

    // stdin is closed when this scope ends so the tool sees EOF
    {
        let mut stdin = child
            .stdin
            .take()
            .with_context(|| format!("{program} has no stdin"))?;
        stdin
            .write_all(text.as_bytes())
            .with_context(|| format!("Failed to write to {program}"))?;
    }

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}

/// Put `text` on the system clipboard
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    if text.is_empty() {
        bail!("Nothing to copy");
    }
    ClipboardTool::detect().copy(text)
}
