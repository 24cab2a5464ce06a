//! Performance Championship Agent Daemon
//!
//! Runs on each participating laptop: connects to the orchestrator,
//! streams metrics and executes scenarios on command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pc_agent::platform::detect_participant;
use pc_agent::Agent;
use pc_core::config::{self, AgentConfig};
use pc_protocol::ParticipantId;

#[derive(Parser)]
#[command(name = "pc-agent")]
#[command(about = "Performance Championship agent - competes on behalf of this laptop")]
#[command(version)]
struct Args {
    /// Orchestrator address (host or host:port)
    /// Example: 192.168.1.20 or stage-laptop:5000
    #[arg(short, long)]
    orchestrator: Option<String>,

    /// Participant to register as (snapdragon or intel); detected when omitted
    #[arg(short, long)]
    participant: Option<ParticipantId>,

    /// Connection attempts before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground {
        "debug"
    } else {
        &args.log_level
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Performance Championship agent starting...");

    // Load configuration
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = config::default_agent_config_path();
            if default_path.exists() {
                config::load_config(&default_path).unwrap_or_else(|e| {
                    tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                    AgentConfig::default()
                })
            } else {
                AgentConfig::default()
            }
        }
    };

    // Apply command-line overrides
    if let Some(orchestrator) = &args.orchestrator {
        config.set_orchestrator(orchestrator);
    }
    if let Some(max_attempts) = args.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    config.validate().context("Invalid agent configuration")?;

    let participant = args
        .participant
        .or(config.participant)
        .unwrap_or_else(detect_participant);

    tracing::info!(
        "Competing as {} against orchestrator at {}",
        participant,
        config.orchestrator_address
    );

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C, shutting down...");
                cancel_clone.cancel();
            }
            Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    Agent::new(config, participant)
        .run(cancel)
        .await
        .context("Agent stopped")?;

    Ok(())
}
