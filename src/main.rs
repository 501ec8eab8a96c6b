mod commands;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::debug;

use recipebox::api::{FetchCoordinator, RecipeClient};
use recipebox::config::{self, Config};
use recipebox::logging;
use recipebox::prefs::SqlitePreferences;

#[derive(Parser, Debug)]
#[command(name = "recipebox")]
#[command(about = "Browse a recipe API from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/recipebox/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init(&config::data_dir()?.join("logs"))?;

  let config = Config::load(args.config.as_deref())?;
  debug!(url = %config.api.url, ttl_secs = config.cache.ttl_secs, "configuration loaded");

  let coordinator = FetchCoordinator::new(RecipeClient::new(&config)?).with_default_ttl(config.cache.ttl());
  let prefs = SqlitePreferences::open(&config.preferences_path()?)?;

  commands::run(args.command, &coordinator, &prefs).await
}
