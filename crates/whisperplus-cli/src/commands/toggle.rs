use anyhow::{Context, Result};
use std::io::Write;
use whisperplus_core::ipc;

/// Ask the running app to start or stop recording
pub async fn run(out: &mut impl Write) -> Result<()> {
    log::debug!("Sending toggle to {}", ipc::socket_path().display());
    ipc::send_toggle()
        .await
        .context("Could not connect to running instance. Is Whisper+ running?")?;
    writeln!(out, "Toggled recording")?;
    Ok(())
}
