use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use whisperplus_core::settings::FilenameMode;
use whisperplus_core::store::SrtConfigStore;
use whisperplus_core::{KeyValueStore, SrtConfig};

use super::{display_value, parse_value};
use crate::args::SrtCommand;

pub async fn run(command: SrtCommand, store: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let srt = SrtConfigStore::load(store)
        .await
        .context("Failed to load subtitle settings")?;

    match command {
        SrtCommand::Show => print_fields(&srt.get(), out)?,
        SrtCommand::Set { key, value } => {
            let updated = srt.set_field(&key, parse_value(&value)).await?;
            print_fields(&updated, out)?;
        }
    }
    Ok(())
}

fn print_fields(config: &SrtConfig, out: &mut impl Write) -> Result<()> {
    let value = serde_json::to_value(config)?;
    for field in SrtConfig::FIELDS {
        let shown = value.get(*field).map(display_value).unwrap_or_default();
        writeln!(out, "{field} = {shown}")?;
    }
    if config.filename_mode == FilenameMode::Custom && config.custom_stem().is_none() {
        writeln!(out, "Custom filename is blank; the source name will be used.")?;
    }
    Ok(())
}
