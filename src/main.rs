//! config-reloader
//!
//! Renders the proxy's upstream include from backend definitions, writes it
//! when it changed and reloads the proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──watcher──▶ config store ──changed──────────────┐
//!                                 │                              ▼
//!                                 │ hosts               ┌─────────────────┐
//!                                 ▼                     │  engine loop    │
//!   system DNS ◀──refresh── resolver cache ──changed──▶ │  + restart      │
//!                                 ▲                     │    scheduler    │
//!                                 │ lookup              └────────┬────────┘
//!                                 │                              ▼
//!                         ┌───────┴───────────────────────────────────────┐
//!                         │ reconciler: render → diff → write → reload    │
//!                         └───────────────────────────┬───────────────────┘
//!                                                     ▼
//!                                  api_backends.conf + proxy reload command
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use config_reloader::config::loader::load_config;
use config_reloader::config::watcher::ConfigWatcher;
use config_reloader::config::ReloaderConfig;
use config_reloader::lifecycle::signals::{forward_reload_signals, wait_for_termination};
use config_reloader::lifecycle::startup::Components;
use config_reloader::lifecycle::Shutdown;
use config_reloader::observability::{logging, metrics};
use config_reloader::resolver::NameResolver;

#[derive(Parser)]
#[command(name = "config-reloader")]
#[command(about = "Keeps the proxy's upstream config in sync with resolved backends", long_about = None)]
struct Cli {
    /// Path to the reloader configuration file.
    #[arg(short, long, default_value = "config/reloader.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reloader until SIGINT/SIGTERM (default)
    Run,
    /// Resolve all hosts once and print the rendered document
    Render,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(config = %cli.config.display(), "config-reloader v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&cli.config, config).await,
        Commands::Render => render(config).await,
    }
}

async fn run(path: &Path, config: ReloaderConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let components = Components::build(&config)?;
    let shutdown = Shutdown::new();

    // Dropping the watcher stops hot reload, so it lives until main returns.
    let _watcher = match ConfigWatcher::new(path, components.store.clone()).run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload unavailable");
            None
        }
    };

    tokio::spawn(components.resolver.clone().run(shutdown.subscribe()));

    let engine = components.engine();
    forward_reload_signals(engine.handle(), shutdown.subscribe());

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        on_signal.trigger();
    });

    let result = engine.run(&shutdown).await;
    shutdown.trigger();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn render(config: ReloaderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let components = Components::build(&config)?;
    components.resolver.resolve_all().await?;
    let document = components.reconciler.render()?;
    print!("{document}");
    Ok(())
}
