//! Tally CLI - command-line front end for the Tally daemon
//!
//! Public commands (greet, prompt, chat) run anonymously. Counter commands
//! sign in with the key file first; each key is its own counter.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_client::{ClientConfig, ClientError, DualContextRouter, KeyFileProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::counter::{self, CounterCommands};
use commands::public;

/// Tally CLI application
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Tally - identity-scoped counters and LLM passthrough", long_about = None)]
#[command(version)]
struct Cli {
    /// Tally daemon endpoint
    #[arg(short, long, env = "TALLY_ENDPOINT", default_value = "http://127.0.0.1:4943")]
    endpoint: String,

    /// Identity key file (created on first use)
    #[arg(short, long, env = "TALLY_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Skip sign-in; counter commands then fail
    #[arg(long)]
    no_sign_in: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Greet someone (default "World")
    Greet {
        /// Name to greet
        name: Option<String>,
    },

    /// Send one prompt to the language model
    Prompt {
        /// Prompt text
        text: String,
    },

    /// Send a conversation to the language model
    Chat {
        /// Turns as `role:content` (system, user or assistant)
        #[arg(required = true)]
        turns: Vec<String>,
    },

    /// Your identity-scoped counter
    Counter {
        #[command(subcommand)]
        command: CounterCommands,
    },

    /// Show the identity your key file proves
    Whoami,

    /// Check daemon connectivity
    Status,
}

fn default_key_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tally")
        .join("identity.key")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let router = DualContextRouter::over_http(ClientConfig {
        endpoint: cli.endpoint.clone(),
        timeout_secs: cli.timeout,
    });
    let key_file = cli.key_file.clone().unwrap_or_else(default_key_file);

    let result = run(&cli, &router, key_file).await;
    if let Err(err) = &result {
        if let Some(ClientError::AuthenticationRequired { .. }) = err.downcast_ref::<ClientError>() {
            output::print_hint("counter commands need a signed-in identity; drop --no-sign-in");
        }
    }
    result
}

async fn run(cli: &Cli, router: &DualContextRouter, key_file: PathBuf) -> Result<()> {
    match &cli.command {
        Commands::Greet { name } => {
            bootstrap(router, &cli.endpoint).await?;
            public::greet(router, name.clone(), cli.json).await
        }
        Commands::Prompt { text } => {
            bootstrap(router, &cli.endpoint).await?;
            public::prompt(router, text.clone(), cli.json).await
        }
        Commands::Chat { turns } => {
            bootstrap(router, &cli.endpoint).await?;
            public::chat(router, turns.clone(), cli.json).await
        }
        Commands::Counter { command } => {
            if !cli.no_sign_in {
                sign_in(router, key_file).await?;
            }
            counter::execute(command.clone(), router, cli.json).await
        }
        Commands::Whoami => {
            let identity = sign_in(router, key_file.clone()).await?;
            output::print_success(&format!("{} ({})", identity, key_file.display()));
            Ok(())
        }
        Commands::Status => match bootstrap(router, &cli.endpoint).await {
            Ok(()) => {
                output::print_success(&format!("Tally daemon reachable at {}", cli.endpoint));
                Ok(())
            }
            Err(e) => {
                output::print_error(&format!("Cannot connect to Tally daemon: {:#}", e));
                std::process::exit(1);
            }
        },
    }
}

async fn bootstrap(router: &DualContextRouter, endpoint: &str) -> Result<()> {
    router
        .bootstrap()
        .await
        .with_context(|| format!("failed to reach tally daemon at {}", endpoint))
}

async fn sign_in(router: &DualContextRouter, key_file: PathBuf) -> Result<tally_types::Identity> {
    let provider = KeyFileProvider::new(&key_file).create_if_missing(true);
    router
        .sign_in(&provider)
        .await
        .with_context(|| format!("failed to sign in with {}", key_file.display()))
}
