use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "whisperplus")]
#[command(version)]
#[command(about = "Companion CLI for the Whisper+ dictation app", long_about = None)]
pub struct Cli {
    /// Settings file to operate on (defaults to the app's settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show or change app settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show or change subtitle (SRT) output preferences
    #[command(subcommand)]
    Srt(SrtCommand),

    /// Browse and manage transcription history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Start or stop recording in the running app
    Toggle,

    /// Explain what global shortcuts can do in this session and how to bind one manually
    ShortcutHelp {
        /// Key combination to show in the instructions (defaults to the configured one)
        shortcut: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print every setting
    Show,

    /// Print one setting
    Get { key: String },

    /// Change one setting. VALUE is parsed as JSON, falling back to a plain string.
    Set { key: String, value: String },

    /// Restore the behaviour toggles to their defaults
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum SrtCommand {
    Show,

    /// Change one field. VALUE is parsed as JSON, falling back to a plain string.
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Newest first
    List {
        /// Only entries containing this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Delete one entry by its id
    Remove { id: i64 },

    /// Delete every entry
    Clear,

    /// Copy an entry to the clipboard (the newest one without an id)
    Copy { id: Option<i64> },
}
