//! Parley - chat web service
//!
//! Main entry point: parses the CLI, loads configuration and dispatches
//! to the `serve` or `history` command.

use std::path::Path;

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley::cli::{Cli, Commands};
use parley::commands;
use parley::config::Config;
use parley::storage::ChatStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load configuration before the subscriber so `logging.json` can pick the format
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    init_tracing(config.logging.json, cli.verbose);
    if Path::new(config_path).exists() {
        tracing::debug!("Loaded configuration from {}", config_path);
    } else {
        tracing::warn!("Config file not found at {}, using defaults", config_path);
    }

    config.validate()?;

    match cli.command {
        Commands::Serve { bind } => {
            commands::serve::run_serve(config, bind).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            let store = ChatStore::new(config.storage.resolve_path()?)?;
            commands::history::handle_history(&store, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(json: bool, verbose: bool) {
    let default_level = if verbose { "parley=debug" } else { "parley=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
