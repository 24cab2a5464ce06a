//! Agent server listener
//!
//! Accepts incoming agent connections and spawns a session for each.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::server::handler::AgentSession;
use crate::state::OrchestratorState;

/// TCP server that agents connect to
pub struct AgentServer {
    listener: TcpListener,
    /// Shared orchestrator state
    state: Arc<OrchestratorState>,
    /// Cancellation token for graceful shutdown
    cancel: CancellationToken,
}

impl AgentServer {
    /// Bind the listening socket
    pub async fn bind(
        bind_addr: &str,
        state: Arc<OrchestratorState>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;

        Ok(Self {
            listener,
            state,
            cancel,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until cancelled
    pub async fn run(self) -> Result<()> {
        tracing::info!("Agent server listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                // Check for shutdown
                _ = self.cancel.cancelled() => {
                    tracing::info!("Agent server shutting down");
                    break;
                }

                // Accept new connections
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, peer_addr)) => {
                            self.handle_connection(socket, peer_addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle a new incoming connection
    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::info!("New connection from {}", peer_addr);

        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
        }

        let session = AgentSession::new(
            Arc::clone(&self.state),
            peer_addr,
            self.cancel.child_token(),
        );
        tokio::spawn(session.run(socket));
    }
}
