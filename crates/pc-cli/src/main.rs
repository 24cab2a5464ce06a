//! Performance championship CLI
//!
//! Single binary for every part of the demo:
//! - Orchestrator (`serve`, accepts agent connections and hosts the IPC port)
//! - Agent (`join`, competes on behalf of this laptop)
//! - Demo control (status, devices, start, stop, conclude, watch, ...)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pc_agent::platform::detect_participant;
use pc_agent::Agent;
use pc_core::config::{self, AgentConfig, OrchestratorConfig};
use pc_orchestrator::Orchestrator;
use pc_protocol::ParticipantId;
use perf_championship::commands::{self, ConfigTarget};
use perf_championship::ipc::OrchestratorClient;
use perf_championship::output::{print_error, print_info, print_success, print_warning};

#[derive(Parser)]
#[command(name = "perf-championship")]
#[command(author, version, about = "Snapdragon vs Intel live performance championship")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Orchestrator IPC address for demo control commands
    #[arg(long, global = true, env = "PC_IPC_ADDRESS")]
    ipc: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator (accepts connections from agents)
    Serve {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,
        /// Agent bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
        /// IPC port (overrides config)
        #[arg(long)]
        ipc_port: Option<u16>,
    },

    /// Compete as an agent on this laptop
    /// Alias: agent
    #[command(alias = "agent")]
    Join {
        /// Orchestrator to connect to (host or host:port)
        orchestrator: Option<String>,
        /// Participant to register as (snapdragon or intel); detected when omitted
        #[arg(short, long)]
        participant: Option<ParticipantId>,
        /// Connection attempts before giving up
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// Show orchestrator status and the current run
    Status,

    /// List participants with their latest metrics
    Devices {
        /// Show host details and temperature
        #[arg(short, long)]
        long: bool,
    },

    /// List configured scenarios
    Scenarios,

    /// Start a scenario on every connected participant
    Start {
        /// Scenario name (see `scenarios`)
        scenario: String,
        /// Follow the run and print the verdict
        #[arg(short, long)]
        wait: bool,
    },

    /// Abandon the current run
    Stop,

    /// Declare a winner with the results collected so far
    Conclude,

    /// Show the commentary history
    Commentary {
        /// Only the most recent lines
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Stream live events from the orchestrator
    Watch {
        /// Include periodic metrics samples
        #[arg(short, long)]
        metrics: bool,
    },

    /// Shut the orchestrator down
    Shutdown,

    /// Manage configuration
    Config {
        /// Which component's configuration
        #[arg(short, long, value_enum, default_value_t = ConfigTarget::Orchestrator)]
        target: ConfigTarget,
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get specific config value
    Get { key: String },
    /// Set config value
    Set { key: String, value: String },
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Edit config in editor
    Edit,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity; long-running commands default to info
    let long_running = matches!(
        cli.command,
        Some(Commands::Serve { .. }) | Some(Commands::Join { .. })
    );
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) if long_running => "info",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut client = match &cli.ipc {
        Some(address) => OrchestratorClient::with_address(address.clone()),
        None => OrchestratorClient::new(),
    };

    // Handle no command - show quick status
    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            show_quick_status(&mut client).await;
            return Ok(());
        }
    };

    match command {
        Commands::Serve {
            foreground,
            bind,
            ipc_port,
        } => {
            run_orchestrator(foreground, bind, ipc_port, cli.config.as_ref()).await?;
        }

        Commands::Join {
            orchestrator,
            participant,
            max_attempts,
        } => {
            run_join(
                orchestrator.as_deref(),
                participant,
                max_attempts,
                cli.config.as_ref(),
            )
            .await?;
        }

        Commands::Status => commands::status_command(&mut client).await?,

        Commands::Devices { long } => commands::devices_command(&mut client, long).await?,

        Commands::Scenarios => commands::scenarios_command(&mut client).await?,

        Commands::Start { scenario, wait } => {
            commands::start_command(&mut client, &scenario, wait).await?
        }

        Commands::Stop => commands::stop_command(&mut client).await?,

        Commands::Conclude => commands::conclude_command(&mut client).await?,

        Commands::Commentary { limit } => commands::commentary_command(&mut client, limit).await?,

        Commands::Watch { metrics } => commands::watch_command(&mut client, metrics).await?,

        Commands::Shutdown => {
            print_info("Stopping orchestrator...");
            match client.shutdown().await {
                Ok(()) => print_success("Orchestrator stopped"),
                Err(e) => {
                    // Connection refused likely means it's not running
                    if e.to_string().contains("Is it running") {
                        print_warning("Orchestrator is not running");
                    } else {
                        print_error(&format!("Failed to stop orchestrator: {}", e));
                        return Err(e);
                    }
                }
            }
        }

        Commands::Config { target, action } => {
            let path = cli.config.as_ref();
            match action {
                ConfigAction::Show => commands::config_show(path, target)?,
                ConfigAction::Get { key } => commands::config_get(path, target, &key)?,
                ConfigAction::Set { key, value } => {
                    commands::config_set(path, target, &key, &value)?
                }
                ConfigAction::Init { force } => commands::config_init(path, target, force)?,
                ConfigAction::Edit => commands::config_edit(path, target)?,
                ConfigAction::Path => {
                    println!("{}", commands::config_path(path, target).display());
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Orchestrator
// ============================================================================

async fn run_orchestrator(
    foreground: bool,
    bind_override: Option<String>,
    ipc_port_override: Option<u16>,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    if !foreground {
        // Daemonize by re-spawning ourselves
        let exe = std::env::current_exe()?;
        let mut cmd = std::process::Command::new(exe);
        cmd.arg("serve").arg("--foreground");
        if let Some(bind) = &bind_override {
            cmd.arg("--bind").arg(bind);
        }
        if let Some(port) = ipc_port_override {
            cmd.arg("--ipc-port").arg(port.to_string());
        }
        if let Some(path) = config_path {
            cmd.arg("--config").arg(path);
        }

        let child = cmd
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        print_success(&format!("Orchestrator started (PID: {})", child.id()));
        return Ok(());
    }

    tracing::info!("Performance Championship orchestrator starting...");

    let mut config: OrchestratorConfig = match config_path {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = config::default_orchestrator_config_path();
            config::load_or_default(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                OrchestratorConfig::default()
            })
        }
    };

    if let Some(bind) = bind_override {
        config.bind_address = bind;
    }
    if let Some(port) = ipc_port_override {
        config.ipc_port = port;
    }

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let orchestrator = Orchestrator::bind(config, cancel)
        .await
        .context("Failed to start orchestrator")?;

    print_success(&format!(
        "Accepting agents on {} (IPC on {})",
        orchestrator.agent_addr(),
        orchestrator.ipc_addr()
    ));

    orchestrator.run().await
}

// ============================================================================
// Agent
// ============================================================================

async fn run_join(
    orchestrator: Option<&str>,
    participant: Option<ParticipantId>,
    max_attempts: Option<u32>,
    config_path: Option<&PathBuf>,
) -> Result<()> {
    let mut config: AgentConfig = match config_path {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = config::default_agent_config_path();
            config::load_or_default(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                AgentConfig::default()
            })
        }
    };

    if let Some(address) = orchestrator {
        config.set_orchestrator(address);
    }
    if let Some(max_attempts) = max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    config.validate().context("Invalid agent configuration")?;

    let participant = participant
        .or(config.participant)
        .unwrap_or_else(detect_participant);

    print_info(&format!(
        "Competing as {} against {}",
        participant.display_name(),
        config.orchestrator_address
    ));

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    Agent::new(config, participant)
        .run(cancel)
        .await
        .context("Agent stopped")?;

    print_info("Left the championship");
    Ok(())
}

/// Cancel the token on Ctrl+C or SIGTERM
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel.cancel();
    });
}

/// One-line overview when no command is given
async fn show_quick_status(client: &mut OrchestratorClient) {
    match client.status().await {
        Ok(status) => {
            print_success(&format!(
                "Orchestrator running: {} participant(s) connected, demo {}",
                status.connected_count, status.demo.phase
            ));
            print_info("Run 'perf-championship --help' for commands");
        }
        Err(_) => {
            print_warning(&format!("No orchestrator at {}", client.address()));
            print_info("Start one with: perf-championship serve");
        }
    }
}
