mod api;
mod app;
mod auth;
mod cart;
mod commands;
mod config;
mod error;
mod event;
mod logging;
mod query;
mod search;
mod store;
mod ui;
mod wishlist;

#[cfg(test)]
mod testing;

use auth::{MemorySessionStore, SessionStore, SqliteSessionStore};
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "A terminal storefront: search, wishlist and cart at a glance")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shelf/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Storefront API base URL, overriding the config file
  #[arg(long)]
  api_url: Option<String>,

  /// Write logs to this file instead of the data directory
  #[arg(long)]
  log_file: Option<PathBuf>,

  /// Keep the session in memory only; nothing is written to disk
  #[arg(long)]
  ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  if let Some(url) = args.api_url {
    config.api.url = url;
    config.api.base_url()?;
  }

  let data_dir = config::Config::data_dir()?;
  let _log_guard = logging::init(args.log_file.as_deref(), &data_dir)?;
  info!(api = %config.api.url, "starting shelf");

  let api = Arc::new(api::client::HttpStorefront::new(&config.api)?);
  let sessions: Arc<dyn SessionStore> = if args.ephemeral {
    Arc::new(MemorySessionStore::new())
  } else {
    std::fs::create_dir_all(&data_dir)?;
    Arc::new(SqliteSessionStore::open(&data_dir.join("session.db"))?)
  };

  let store = store::Storefront::init(
    api,
    sessions,
    config.cache.policy(),
    config.search.settings(),
  );

  let title = config.title.clone().unwrap_or_else(|| config.api.host());

  // Initialize and run the app
  let events = event::EventHandler::new(Duration::from_millis(250));
  let mut app = app::App::new(title, store, events.sender());
  app.run(events).await?;

  Ok(())
}
