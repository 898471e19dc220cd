//! # Signer Runtime
//!
//! Admin entry point for the signer session layer.
//!
//! ```text
//! signer-runtime control nonce
//! signer-runtime control update-allowlist '["02ab...@1.2.3.4:9735"]'
//! signer-runtime state
//! signer-runtime clear-state
//! ```
//!
//! Configuration comes from defaults, then `VS_*` environment variables,
//! then the flags below.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use signer_runtime::{parse_command, RuntimeConfig, SignerContainer};
use vs_01_mutation_store::MutationStoreApi;
use vs_04_control_channel::{ControlApi, ControlCommand, ControlResponse};

#[derive(Parser, Debug)]
#[command(name = "signer-runtime")]
#[command(about = "Session layer runtime and admin tool for a remote Lightning signer")]
struct Cli {
    /// Directory holding the state file
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Root URL of the control endpoint
    #[arg(long)]
    api_root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a signed control command and print the response
    Control {
        /// Command name, e.g. `nonce`, `query-policy`, `update-allowlist`
        command: String,
        /// JSON content for commands that carry one
        content: Option<String>,
    },
    /// Print the persisted engine state records
    State,
    /// Erase every persisted engine state record
    ClearState,
}

fn load_config(cli: &Cli) -> RuntimeConfig {
    let mut config = RuntimeConfig::from_env();
    if let Some(dir) = &cli.state_dir {
        config.storage.state_dir = dir.clone();
    }
    if let Some(root) = &cli.api_root {
        config.control.api_root = root.clone();
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str())),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let container = SignerContainer::open(load_config(&cli))
        .await
        .context("failed to open signer state")?;

    match cli.command {
        Command::Control { command, content } => {
            let command = parse_command(&command, content.as_deref())?;
            let response = match command {
                ControlCommand::Nonce => ControlResponse::Nonce(container.control.query_nonce().await?),
                other => container.control.send(other).await?,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::State => {
            let snapshot = container.store.snapshot().await?;
            for (name, (version, payload)) in &snapshot {
                println!("{name}\tv{version}\t{} bytes", payload.len());
            }
            info!(records = snapshot.len(), "State listed");
        }
        Command::ClearState => {
            let removed = container.store.clear().await?;
            println!("removed {removed} records");
        }
    }

    Ok(())
}
