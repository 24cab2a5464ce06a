//! Orchestrator assembly
//!
//! Binds both listeners up front so callers (and tests using port 0) learn
//! the real addresses before anything runs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use pc_core::config::OrchestratorConfig;

use crate::connection::LivenessMonitor;
use crate::ipc::IpcServer;
use crate::server::AgentServer;
use crate::state::OrchestratorState;

/// A bound, ready-to-run orchestrator
pub struct Orchestrator {
    state: Arc<OrchestratorState>,
    agent_server: AgentServer,
    ipc_server: IpcServer,
    agent_addr: SocketAddr,
    ipc_addr: SocketAddr,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Bind the agent and IPC listeners described by `config`
    pub async fn bind(config: OrchestratorConfig, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;

        let bind_address = config.bind_address.clone();
        let ipc_address = config.ipc_address();
        let state = Arc::new(OrchestratorState::new(config));

        let agent_server =
            AgentServer::bind(&bind_address, Arc::clone(&state), cancel.clone()).await?;
        let ipc_server = IpcServer::bind(&ipc_address, Arc::clone(&state))
            .await?
            .with_shutdown_token(cancel.clone());

        let agent_addr = agent_server.local_addr()?;
        let ipc_addr = ipc_server.local_addr()?;

        Ok(Self {
            state,
            agent_server,
            ipc_server,
            agent_addr,
            ipc_addr,
            cancel,
        })
    }

    pub fn agent_addr(&self) -> SocketAddr {
        self.agent_addr
    }

    pub fn ipc_addr(&self) -> SocketAddr {
        self.ipc_addr
    }

    pub fn state(&self) -> Arc<OrchestratorState> {
        Arc::clone(&self.state)
    }

    /// Run until the cancellation token fires
    pub async fn run(self) -> Result<()> {
        let monitor = LivenessMonitor::new(
            Arc::clone(&self.state.registry),
            self.state.events.clone(),
            self.state.config.liveness_interval,
            self.state.config.liveness_threshold,
        );
        let liveness = monitor.spawn(self.cancel.clone());

        let ipc_cancel = self.cancel.clone();
        let ipc_server = self.ipc_server;
        let ipc = tokio::spawn(async move {
            if let Err(e) = ipc_server.run().await {
                tracing::error!("IPC server error: {}", e);
                ipc_cancel.cancel();
            }
        });

        let result = self.agent_server.run().await;

        // Whatever ended the agent server ends everything else too
        self.cancel.cancel();
        if let Err(e) = ipc.await {
            tracing::warn!("IPC task ended abnormally: {}", e);
        }
        if let Err(e) = liveness.await {
            tracing::warn!("Liveness task ended abnormally: {}", e);
        }

        result
    }
}
