//! Tally Daemon - identity-scoped counter service
//!
//! The daemon provides:
//! - REST API for greeting, language model passthrough and counters
//! - Caller derivation from Ed25519-signed requests
//! - Counter persistence across restarts

use clap::Parser;
use std::path::PathBuf;
use tally_daemon::error::{DaemonError, DaemonResult};
use tally_daemon::{DaemonConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tally Daemon CLI
#[derive(Parser)]
#[command(name = "tallyd")]
#[command(about = "Tally Daemon - identity-scoped counter service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TALLY_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "TALLY_LISTEN_ADDR")]
    listen: Option<String>,

    /// Snapshot file path
    #[arg(long, env = "TALLY_SNAPSHOT_PATH")]
    snapshot: Option<PathBuf>,

    /// Keep counters in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Log level, overriding `logging.level`
    #[arg(long, env = "TALLY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "TALLY_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Initialize tracing
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(snapshot) = cli.snapshot {
        config.store.snapshot_path = snapshot;
    }
    if cli.ephemeral {
        config.store.persistence = false;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        persistence = config.store.persistence,
        snapshot = %config.store.snapshot_path.display(),
        llm = ?config.llm.kind,
        "Starting tally daemon"
    );

    let server = Server::new(config)?;
    server.run().await
}
