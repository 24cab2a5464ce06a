//! IPC server implementation
//!
//! Listens on localhost TCP for requests from observers. Every connected
//! observer also receives the orchestrator's events, interleaved with
//! responses on the same line stream.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use pc_core::ipc::{IpcEvent, IpcRequest, IpcResponse};

use crate::state::OrchestratorState;

/// IPC server for observers
///
/// Listens on localhost (127.0.0.1) only - not accessible from network.
pub struct IpcServer {
    listener: TcpListener,
    /// Orchestrator state
    state: Arc<OrchestratorState>,
    /// Cancellation token for shutdown
    shutdown_token: Option<CancellationToken>,
}

impl IpcServer {
    /// Bind the IPC listener
    pub async fn bind(address: &str, state: Arc<OrchestratorState>) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("Failed to bind IPC server to {}", address))?;

        Ok(Self {
            listener,
            state,
            shutdown_token: None,
        })
    }

    /// Set the shutdown token (call before run)
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = Some(token);
        self
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve observers until the shutdown token fires
    pub async fn run(self) -> Result<()> {
        tracing::info!("IPC server listening on {}", self.local_addr()?);

        let shutdown = self.shutdown_token.clone().unwrap_or_default();

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("IPC server shutting down");
                    break;
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    // Only accept connections from localhost
                    if !peer_addr.ip().is_loopback() {
                        tracing::warn!("Rejected non-localhost connection from {}", peer_addr);
                        continue;
                    }

                    tracing::debug!("Observer connected from {}", peer_addr);
                    let state = Arc::clone(&self.state);
                    let shutdown_token = self.shutdown_token.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, state, shutdown_token).await {
                            tracing::warn!("IPC client error: {}", e);
                        }
                        tracing::debug!("Observer {} disconnected", peer_addr);
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept IPC connection: {}", e);
                }
            }
        }

        Ok(())
    }
}

async fn handle_client(
    stream: TcpStream,
    state: Arc<OrchestratorState>,
    shutdown_token: Option<CancellationToken>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let shutdown = shutdown_token.clone().unwrap_or_default();

    // Subscribe to events
    let mut event_rx = state.events.subscribe();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            // Handle incoming requests
            result = reader.read_line(&mut line) => {
                match result {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            line.clear();
                            continue;
                        }

                        let response = match serde_json::from_str::<IpcRequest>(trimmed) {
                            Ok(request) => {
                                tracing::debug!("IPC request: {:?}", request);
                                handle_request(request, &state, shutdown_token.as_ref()).await
                            }
                            Err(e) => IpcResponse::Error {
                                message: format!("Invalid request: {}", e),
                            },
                        };

                        let mut response_json = serde_json::to_string(&response)?;
                        response_json.push('\n');
                        writer.write_all(response_json.as_bytes()).await?;

                        line.clear();
                    }
                    Err(e) => {
                        return Err(e.into());
                    }
                }
            }

            // Forward events to the observer
            result = event_rx.recv() => {
                match result {
                    Ok(event) => {
                        let mut event_json = serde_json::to_string(&event)?;
                        event_json.push('\n');
                        writer.write_all(event_json.as_bytes()).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("IPC client lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

async fn handle_request(
    request: IpcRequest,
    state: &OrchestratorState,
    shutdown_token: Option<&CancellationToken>,
) -> IpcResponse {
    match request {
        IpcRequest::GetStatus => IpcResponse::Status(state.status().await),

        IpcRequest::ListDevices => IpcResponse::Devices {
            devices: state.devices(),
        },

        IpcRequest::ListScenarios => IpcResponse::Scenarios {
            scenarios: state.scenarios(),
        },

        IpcRequest::GetCommentary => IpcResponse::Commentary {
            entries: state.coordinator.commentary().await,
        },

        IpcRequest::StartDemo { scenario } => match state.start_demo(&scenario).await {
            Ok(started) => IpcResponse::DemoStarted {
                scenario: started.scenario,
                run_id: started.run_id,
                dispatched: started.dispatched,
            },
            Err(e) => IpcResponse::Error {
                message: e.to_string(),
            },
        },

        IpcRequest::StopDemo => match state.stop_demo().await {
            Ok(()) => IpcResponse::Ok,
            Err(e) => IpcResponse::Error {
                message: e.to_string(),
            },
        },

        IpcRequest::ConcludeDemo => match state.conclude_demo().await {
            Ok(()) => IpcResponse::Ok,
            Err(e) => IpcResponse::Error {
                message: e.to_string(),
            },
        },

        IpcRequest::Ping => IpcResponse::Pong,

        IpcRequest::Shutdown => {
            tracing::info!("Shutdown requested via IPC");
            if let Some(token) = shutdown_token {
                token.cancel();
                IpcResponse::Ok
            } else {
                IpcResponse::Error {
                    message: "Shutdown not supported (no shutdown token configured)".to_string(),
                }
            }
        }
    }
}
