//! Agent main loop
//!
//! Connect, register, then report metrics and execute scenarios until the
//! connection drops. A lost connection cancels any run in flight and goes
//! back through the bounded connect policy; running out of attempts or
//! being rejected ends the agent.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use pc_core::config::AgentConfig;
use pc_core::error::{AgentError, ConnectionError};
use pc_core::traits::{MetricsSource, WorkloadFactory};
use pc_protocol::{ErrorCode, Message, ParticipantId, ScenarioConfig};

use crate::executor::Executor;
use crate::metrics::SystemMetrics;
use crate::reporter::MetricsReporter;
use crate::state::AgentState;
use crate::tunnel::{ActiveTunnel, LinearBackoff, TunnelConnector, TunnelEvent};
use crate::workload::SimulatedWorkloadFactory;

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// A measurement agent
pub struct Agent {
    state: AgentState,
    executor: Executor,
    reporter: MetricsReporter,
}

impl Agent {
    /// Agent with simulated workloads and host metrics
    pub fn new(config: AgentConfig, participant: ParticipantId) -> Self {
        let state = AgentState::new(config, participant);
        let simulation = state.profile.simulation.clone();
        Self::with_parts(
            state,
            Arc::new(SimulatedWorkloadFactory::new(simulation.clone())),
            Box::new(SystemMetrics::new(simulation)),
        )
    }

    /// Agent with custom workloads and metrics
    pub fn with_parts(
        state: AgentState,
        factory: Arc<dyn WorkloadFactory>,
        source: Box<dyn MetricsSource>,
    ) -> Self {
        let executor = Executor::new(state.participant, factory);
        let reporter =
            MetricsReporter::new(state.participant, source, state.config.metrics_interval);
        Self {
            state,
            executor,
            reporter,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run until cancelled, or until the orchestrator can no longer be reached
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ConnectionError> {
        tracing::info!(
            "Agent running as {} ({})",
            self.state.participant,
            self.state.profile.name
        );
        let connector = TunnelConnector::new(self.state.config.clone(), self.state.participant);

        loop {
            let backoff = LinearBackoff::from_config(&self.state.config.retry);
            let tunnel = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                result = connector.connect_with_retry(backoff) => result?,
            };

            let end = self.run_session(tunnel, &cancel).await;

            // Any run in flight belonged to the session that just ended
            self.executor.stop().await;

            match end {
                SessionEnd::Shutdown => {
                    tracing::info!("Agent shutting down");
                    return Ok(());
                }
                SessionEnd::Lost(reason) => {
                    tracing::warn!("Disconnected: {}. Reconnecting...", reason);
                }
            }
        }
    }

    /// Serve one connection
    async fn run_session(&mut self, mut tunnel: ActiveTunnel, cancel: &CancellationToken) -> SessionEnd {
        let sink = tunnel.sender();
        let mut ticker = tokio::time::interval(self.reporter.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.executor.stop().await;
                    drop(sink);
                    tunnel.close().await;
                    return SessionEnd::Shutdown;
                }

                _ = ticker.tick() => {
                    let workload = self.executor.current().await;
                    let message = self.reporter.report(workload.as_deref());
                    if sink.send(message).await.is_err() {
                        return SessionEnd::Lost("writer closed".to_string());
                    }
                }

                event = tunnel.recv_event() => match event {
                    TunnelEvent::Start { run_id, config } => {
                        self.handle_start(run_id, config, &sink).await;
                    }
                    TunnelEvent::Stop => {
                        if !self.executor.stop().await {
                            tracing::debug!("Stop received while idle");
                        }
                    }
                    TunnelEvent::Disconnected(reason) => {
                        return SessionEnd::Lost(reason);
                    }
                },
            }
        }
    }

    async fn handle_start(&self, run_id: u64, config: ScenarioConfig, sink: &mpsc::Sender<Message>) {
        match self.executor.start(run_id, config, Arc::new(sink.clone())).await {
            Ok(_) => {}
            Err(AgentError::Busy(current)) => {
                tracing::warn!(
                    "Rejecting run {}: already executing {}",
                    run_id,
                    current
                );
                let error = Message::Error {
                    code: ErrorCode::Busy,
                    message: format!("already executing {}", current),
                };
                if sink.send(error).await.is_err() {
                    tracing::debug!("Could not report busy: writer closed");
                }
            }
            Err(e) => tracing::error!("Failed to start run {}: {}", run_id, e),
        }
    }
}
