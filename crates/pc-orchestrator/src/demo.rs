//! Demo control: ties the coordinator to observers and agents

use rand::seq::SliceRandom;

use pc_core::error::ScenarioError;
use pc_core::ipc::IpcEvent;
use pc_core::time::current_time_millis;
use pc_protocol::{ParticipantId, ResultPayload};

use crate::connection::AgentCommand;
use crate::coordinator::ResultOutcome;
use crate::state::OrchestratorState;

/// A started run as reported back to the requester
#[derive(Debug, Clone, PartialEq)]
pub struct DemoStarted {
    pub scenario: String,
    pub run_id: u64,
    pub dispatched: Vec<ParticipantId>,
}

impl OrchestratorState {
    /// Start a scenario and dispatch it to every connected agent
    pub async fn start_demo(&self, scenario: &str) -> Result<DemoStarted, ScenarioError> {
        let now = current_time_millis();
        let run = self.coordinator.start(scenario, now).await?;

        let loading_message = self
            .config
            .loading_messages
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();

        tracing::info!("Starting {} (run {})", scenario, run.run_id);
        self.events.publish(IpcEvent::ScenarioStarted {
            scenario: scenario.to_string(),
            run_id: run.run_id,
            loading_message,
            duration_secs: run.config.duration_secs,
            timestamp: now,
        });

        let dispatched = self
            .connections
            .broadcast(AgentCommand::StartScenario {
                run_id: run.run_id,
                config: run.config,
            });
        if dispatched.is_empty() {
            tracing::warn!("No agents connected; run {} will wait", run.run_id);
        }

        Ok(DemoStarted {
            scenario: scenario.to_string(),
            run_id: run.run_id,
            dispatched,
        })
    }

    /// Abandon the current run
    pub async fn stop_demo(&self) -> Result<(), ScenarioError> {
        let stopped = self.coordinator.stop().await?;
        tracing::info!("Stopped {:?} (run {:?})", stopped.scenario, stopped.run_id);

        self.events.publish(IpcEvent::ScenarioStopped {
            scenario: stopped.scenario,
            run_id: stopped.run_id,
            timestamp: current_time_millis(),
        });
        self.connections.broadcast(AgentCommand::StopScenario);
        Ok(())
    }

    /// Declare a winner from the results collected so far
    pub async fn conclude_demo(&self) -> Result<(), ScenarioError> {
        let verdict = self.coordinator.conclude(current_time_millis()).await?;
        tracing::info!("Concluded run {}: {}", verdict.run_id, verdict.message);
        self.events.publish(IpcEvent::WinnerDeclared(verdict));

        // Stragglers are still executing
        self.connections.broadcast(AgentCommand::StopScenario);
        Ok(())
    }

    /// Terminal result from an agent
    pub async fn handle_result(
        &self,
        participant: ParticipantId,
        scenario: &str,
        run_id: u64,
        result: ResultPayload,
    ) {
        let outcome = self
            .coordinator
            .record_result(participant, scenario, run_id, result, current_time_millis())
            .await;

        match outcome {
            ResultOutcome::Accepted => {
                tracing::info!("{} finished {} (run {})", participant, scenario, run_id);
            }
            ResultOutcome::Completed(verdict) => {
                tracing::info!("Run {} complete: {}", run_id, verdict.message);
                self.events.publish(IpcEvent::WinnerDeclared(verdict));
            }
            ResultOutcome::Dropped(reason) => {
                tracing::warn!(
                    "Dropping result from {} for {} (run {}): {}",
                    participant,
                    scenario,
                    run_id,
                    reason
                );
            }
        }
    }

    /// Per-step progress from an agent
    pub async fn handle_progress(
        &self,
        participant: ParticipantId,
        scenario: &str,
        run_id: u64,
        step: u32,
        total_steps: u32,
    ) {
        if !self.coordinator.is_current(scenario, run_id).await {
            tracing::debug!("Ignoring progress for stale run {} from {}", run_id, participant);
            return;
        }

        self.events.publish(IpcEvent::ScenarioProgress {
            device: participant,
            scenario: scenario.to_string(),
            run_id,
            step,
            total_steps,
            fraction: step as f64 / total_steps.max(1) as f64,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_core::config::OrchestratorConfig;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::connection::AgentLink;

    fn connect(
        state: &OrchestratorState,
        id: ParticipantId,
    ) -> mpsc::Receiver<AgentCommand> {
        connect_with_capacity(state, id, 8)
    }

    fn connect_with_capacity(
        state: &OrchestratorState,
        id: ParticipantId,
        capacity: usize,
    ) -> mpsc::Receiver<AgentCommand> {
        let (tx, rx) = mpsc::channel(capacity);
        state.connections.insert(AgentLink::new(
            id,
            state.connections.next_connection_id(),
            tx,
            CancellationToken::new(),
        ));
        rx
    }

    #[tokio::test]
    async fn test_start_dispatches_and_announces() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        let mut events = state.events.subscribe();
        let mut snap_rx = connect(&state, ParticipantId::Snapdragon);

        let started = state.start_demo("ai_showdown").await.unwrap();
        assert_eq!(started.dispatched, vec![ParticipantId::Snapdragon]);

        match events.try_recv().unwrap() {
            IpcEvent::ScenarioStarted {
                scenario,
                run_id,
                loading_message,
                duration_secs,
                ..
            } => {
                assert_eq!(scenario, "ai_showdown");
                assert_eq!(run_id, started.run_id);
                assert_eq!(duration_secs, 30);
                assert!(state.config.loading_messages.contains(&loading_message));
            }
            other => panic!("unexpected {:?}", other),
        }

        match snap_rx.recv().await.unwrap() {
            AgentCommand::StartScenario { run_id, config } => {
                assert_eq!(run_id, started.run_id);
                assert_eq!(config.name, "ai_showdown");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_reaches_healthy_agent_past_stalled_one() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        // Snapdragon never drains its queue; the start command fills it
        let _snap_rx = connect_with_capacity(&state, ParticipantId::Snapdragon, 1);
        let mut intel_rx = connect(&state, ParticipantId::Intel);

        let started = state.start_demo("ai_showdown").await.unwrap();
        assert_eq!(started.dispatched, ParticipantId::ALL.to_vec());

        tokio::time::timeout(std::time::Duration::from_secs(1), state.stop_demo())
            .await
            .expect("stop_demo blocked on a stalled agent")
            .unwrap();

        assert!(matches!(
            intel_rx.recv().await,
            Some(AgentCommand::StartScenario { .. })
        ));
        assert!(matches!(
            intel_rx.recv().await,
            Some(AgentCommand::StopScenario)
        ));
    }

    #[tokio::test]
    async fn test_progress_fraction_and_stale_filter() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        let started = state.start_demo("ai_showdown").await.unwrap();
        let mut events = state.events.subscribe();

        state
            .handle_progress(ParticipantId::Intel, "ai_showdown", started.run_id + 1, 1, 20)
            .await;
        assert!(events.try_recv().is_err());

        state
            .handle_progress(ParticipantId::Intel, "ai_showdown", started.run_id, 5, 20)
            .await;
        match events.try_recv().unwrap() {
            IpcEvent::ScenarioProgress { fraction, step, .. } => {
                assert_eq!(step, 5);
                assert_eq!(fraction, 0.25);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnected_participant_then_conclude() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        let mut snap_rx = connect(&state, ParticipantId::Snapdragon);
        let started = state.start_demo("ai_showdown").await.unwrap();
        let mut events = state.events.subscribe();

        state
            .handle_result(
                ParticipantId::Snapdragon,
                "ai_showdown",
                started.run_id,
                ResultPayload::elapsed(9.0),
            )
            .await;
        // Intel never reports
        assert!(events.try_recv().is_err());
        assert_eq!(
            state.coordinator.status().await.phase,
            pc_core::DemoPhase::Aggregating
        );

        state.conclude_demo().await.unwrap();
        match events.try_recv().unwrap() {
            IpcEvent::WinnerDeclared(verdict) => {
                assert_eq!(verdict.winner, Some(ParticipantId::Snapdragon));
                assert!(verdict.standings[1].lost);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Start command, then the stop sent on conclude
        assert!(matches!(
            snap_rx.recv().await,
            Some(AgentCommand::StartScenario { .. })
        ));
        assert!(matches!(
            snap_rx.recv().await,
            Some(AgentCommand::StopScenario)
        ));
    }

    #[tokio::test]
    async fn test_stop_while_idle_rejected() {
        let state = OrchestratorState::new(OrchestratorConfig::default());
        assert_eq!(state.stop_demo().await, Err(ScenarioError::NotRunning));

        state.start_demo("thermal_test").await.unwrap();
        let mut events = state.events.subscribe();
        state.stop_demo().await.unwrap();
        assert!(matches!(
            events.try_recv().unwrap(),
            IpcEvent::ScenarioStopped { .. }
        ));
    }
}
