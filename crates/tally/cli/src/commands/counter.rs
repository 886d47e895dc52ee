//! Counter commands
//!
//! These always run through the authenticated context; the daemon keys the
//! counter by the signing identity.

use crate::output::print_result;
use anyhow::Result;
use clap::Subcommand;
use serde_json::json;
use tally_client::DualContextRouter;

/// Counter subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum CounterCommands {
    /// Show your counter
    Get,

    /// Add one to your counter
    #[command(alias = "inc")]
    Increment,

    /// Overwrite your counter
    Set {
        /// New value
        value: u64,
    },
}

/// Execute a counter command
pub async fn execute(command: CounterCommands, router: &DualContextRouter, json: bool) -> Result<()> {
    let value = match command {
        CounterCommands::Get => router.read_counter().await?,
        CounterCommands::Increment => router.increment_counter().await?,
        CounterCommands::Set { value } => router.set_counter(value).await?,
    };

    let owner = router
        .identity()
        .map(|identity| identity.to_hex())
        .unwrap_or_default();
    print_result(value, json!({ "owner": owner, "value": value }), json);
    Ok(())
}
