use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use whisperplus_core::settings::keys;
use whisperplus_core::{ConfigStore, KeyValueStore};

use super::{display_value, parse_value};
use crate::args::ConfigCommand;

const AUTOSTART_NOTICE: &str = "autostart is managed by the running app (Settings → Launch at login)";

pub async fn run(command: ConfigCommand, store: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let config = ConfigStore::load(store)
        .await
        .context("Failed to load settings")?;

    match command {
        ConfigCommand::Show => {
            let entries = config.get().to_entries();
            for key in keys::PERSISTED {
                if let Some(value) = entries.get(*key) {
                    writeln!(out, "{key} = {}", shown(key, value))?;
                }
            }
        }
        ConfigCommand::Get { key } => {
            if key == keys::AUTOSTART {
                bail!(AUTOSTART_NOTICE);
            }
            let entries = config.get().to_entries();
            let value = entries
                .get(&key)
                .with_context(|| format!("Unknown setting '{key}'"))?;
            writeln!(out, "{}", shown(&key, value))?;
        }
        ConfigCommand::Set { key, value } => {
            if key == keys::AUTOSTART {
                bail!(AUTOSTART_NOTICE);
            }
            let updated = config.update_setting(&key, parse_value(&value)).await?;
            let entries = updated.to_entries();
            if let Some(stored) = entries.get(&key) {
                writeln!(out, "{key} = {}", shown(&key, stored))?;
            }
            if keys::SHORTCUT_AFFECTING.contains(&key.as_str()) {
                writeln!(out, "Restart Whisper+ for the shortcut change to take effect.")?;
            }
        }
        ConfigCommand::Reset => {
            config.reset_defaults().await?;
            writeln!(out, "Settings reset to defaults (token and shortcut kept).")?;
        }
    }
    Ok(())
}

/// Tokens are never echoed in full
fn shown(key: &str, value: &Value) -> String {
    if key != keys::TOKEN {
        return display_value(value);
    }
    match value.as_str() {
        Some("") | None => "(not set)".to_string(),
        Some(token) if token.chars().count() <= 8 => "********".to_string(),
        Some(token) => {
            let tail: String = token.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("********{tail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use whisperplus_core::MemoryStore;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn show_masks_the_token() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set("token", json!("secret-session-token-1234")).await.unwrap();

        let mut buf = Vec::new();
        run(ConfigCommand::Show, store, &mut buf).await.unwrap();
        let text = output(buf);

        assert!(text.contains("token = ********1234"));
        assert!(!text.contains("secret"));
        assert!(text.contains("transcriptionEngine = cloud"));
    }

    #[tokio::test]
    async fn set_parses_and_persists() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut buf = Vec::new();
        run(
            ConfigCommand::Set {
                key: "autoPaste".into(),
                value: "false".into(),
            },
            store.clone(),
            &mut buf,
        )
        .await
        .unwrap();

        assert_eq!(output(buf), "autoPaste = false\n");
        assert_eq!(store.get("autoPaste").await.unwrap(), Some(json!(false)));
    }

    #[tokio::test]
    async fn invalid_values_are_rejected() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let result = run(
            ConfigCommand::Set {
                key: "autoPaste".into(),
                value: "maybe".into(),
            },
            store.clone(),
            &mut Vec::new(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.get("autoPaste").await.unwrap(), None);
    }

    #[tokio::test]
    async fn autostart_is_refused() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let err = run(ConfigCommand::Get { key: "autostart".into() }, store, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("managed by the running app"));
    }

    #[tokio::test]
    async fn shortcut_changes_ask_for_restart() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut buf = Vec::new();
        run(
            ConfigCommand::Set {
                key: "recordMode".into(),
                value: "hold".into(),
            },
            store,
            &mut buf,
        )
        .await
        .unwrap();

        let text = output(buf);
        assert!(text.starts_with("recordMode = hold\n"));
        assert!(text.contains("Restart Whisper+"));
    }

    #[test]
    fn short_tokens_are_fully_hidden() {
        assert_eq!(shown("token", &json!("abc")), "********");
        assert_eq!(shown("token", &json!("")), "(not set)");
        assert_eq!(shown("autoCopy", &json!(true)), "true");
    }
}
