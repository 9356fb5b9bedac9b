mod app;
mod config;
mod error;
mod logging;
mod models;
mod notify;
mod remote;
mod render;
mod store;
mod sync;

#[cfg(test)]
mod testutil;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use crate::app::{App, Command};
use crate::notify::TerminalNotifier;
use crate::remote::ApiClient;
use crate::store::{MemoryStore, SqliteStore};
use crate::sync::SyncCache;

#[derive(Parser, Debug)]
#[command(name = "restoreview")]
#[command(about = "Offline-first client for the restaurant reviews API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/restoreview/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// GraphQL endpoint to use
  #[arg(long)]
  api_url: Option<String>,

  /// Keep local data in memory for this run only
  #[arg(long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, command line wins over file and environment
  let config = config::Config::load(args.config.as_deref())?.with_api_url(args.api_url);

  let _log_guard = logging::init(&config.log)?;

  let gateway = ApiClient::new(&config.api)?;
  let mut stdout = std::io::stdout();

  if args.ephemeral {
    let cache = SyncCache::new(MemoryStore::new(), gateway);
    let app = App::new(cache, TerminalNotifier, &config.notifications);
    app.run(args.command, &mut stdout).await
  } else {
    let path = config.store.resolve_path()?;
    let store = SqliteStore::open(&path)
      .map_err(|e| eyre!("Failed to open local store {}: {}", path.display(), e))?;
    let cache = SyncCache::new(store, gateway);
    let app = App::new(cache, TerminalNotifier, &config.notifications);
    app.run(args.command, &mut stdout).await
  }
}
