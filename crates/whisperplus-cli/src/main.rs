mod args;
mod commands;

use anyhow::Result;
use clap::Parser;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Config(command) => {
            let store = commands::open_store(cli.store.as_deref()).await?;
            commands::config::run(command, store, &mut out).await
        }
        Commands::Srt(command) => {
            let store = commands::open_store(cli.store.as_deref()).await?;
            commands::srt::run(command, store, &mut out).await
        }
        Commands::History(command) => {
            let store = commands::open_store(cli.store.as_deref()).await?;
            commands::history::run(command, store, &mut out).await
        }
        Commands::Toggle => commands::toggle::run(&mut out).await,
        Commands::ShortcutHelp { shortcut } => {
            let store = commands::open_store(cli.store.as_deref()).await?;
            commands::shortcut::run(shortcut, store, &mut out).await
        }
    }
}

/// `-v` raises the default filter to debug; `RUST_LOG` still wins
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}
