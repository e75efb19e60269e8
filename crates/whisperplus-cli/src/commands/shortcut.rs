use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use whisperplus_core::{Capabilities, ConfigStore, KeyValueStore, SessionType};

pub async fn run(shortcut: Option<String>, store: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let shortcut = match shortcut {
        Some(shortcut) => shortcut,
        None => {
            let config = ConfigStore::load(store)
                .await
                .context("Failed to load settings")?;
            config.get().global_shortcut
        }
    };
    let capabilities = Capabilities::for_session(SessionType::from_env());
    write_help(&capabilities, &shortcut, out)
}

fn write_help(capabilities: &Capabilities, shortcut: &str, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "Session: {} ({})",
        capabilities.session, capabilities.compositor
    )?;
    for notice in [capabilities.hold_mode_notice(), capabilities.auto_paste_notice()]
        .into_iter()
        .flatten()
    {
        writeln!(out, "Note: {notice}")?;
    }
    writeln!(out)?;
    writeln!(out, "To bind {shortcut} yourself:")?;
    for line in capabilities.manual_setup_instructions(shortcut) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
