//! Scenario execution slot
//!
//! An agent runs at most one scenario at a time. A start while executing
//! is rejected, never queued. Stopping is cooperative: the run checks its
//! cancellation token before every step and while sleeping between steps,
//! and a cancelled run sends no result.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use pc_core::error::AgentError;
use pc_core::traits::{MessageSink, StepContext, Workload, WorkloadFactory};
use pc_protocol::{Message, ParticipantId, ResultPayload, ScenarioConfig};

/// What the agent is doing
#[derive(Debug, Default)]
enum Slot {
    #[default]
    Idle,
    Executing {
        scenario: String,
        run_id: u64,
        cancel: CancellationToken,
    },
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Result delivered
    Completed,
    /// Stopped before the final step
    Cancelled,
    /// The outbound channel went away
    Disconnected,
}

/// Runs scenarios one at a time
#[derive(Clone)]
pub struct Executor {
    participant: ParticipantId,
    factory: Arc<dyn WorkloadFactory>,
    slot: Arc<Mutex<Slot>>,
}

impl Executor {
    pub fn new(participant: ParticipantId, factory: Arc<dyn WorkloadFactory>) -> Self {
        Self {
            participant,
            factory,
            slot: Arc::new(Mutex::new(Slot::Idle)),
        }
    }

    /// Begin a run in the background
    pub async fn start(
        &self,
        run_id: u64,
        config: ScenarioConfig,
        sink: Arc<dyn MessageSink>,
    ) -> Result<tokio::task::JoinHandle<RunOutcome>, AgentError> {
        let mut slot = self.slot.lock().await;
        if let Slot::Executing { scenario, .. } = &*slot {
            return Err(AgentError::Busy(scenario.clone()));
        }

        let cancel = CancellationToken::new();
        *slot = Slot::Executing {
            scenario: config.name.clone(),
            run_id,
            cancel: cancel.clone(),
        };
        drop(slot);

        tracing::info!("Starting {} (run {})", config.name, run_id);
        let workload = self.factory.create(&config);
        let participant = self.participant;
        let slot = Arc::clone(&self.slot);

        Ok(tokio::spawn(async move {
            let outcome = run_scenario(participant, run_id, &config, workload, sink, &cancel).await;
            tracing::info!("{} (run {}) ended: {:?}", config.name, run_id, outcome);

            // A stop followed by a new start may already own the slot
            let mut slot = slot.lock().await;
            if matches!(&*slot, Slot::Executing { run_id: current, .. } if *current == run_id) {
                *slot = Slot::Idle;
            }
            outcome
        }))
    }

    /// Cancel the current run; false when idle
    pub async fn stop(&self) -> bool {
        let mut slot = self.slot.lock().await;
        match std::mem::take(&mut *slot) {
            Slot::Executing {
                scenario,
                run_id,
                cancel,
            } => {
                tracing::info!("Stopping {} (run {})", scenario, run_id);
                cancel.cancel();
                true
            }
            Slot::Idle => false,
        }
    }

    /// Scenario currently executing
    pub async fn current(&self) -> Option<String> {
        match &*self.slot.lock().await {
            Slot::Executing { scenario, .. } => Some(scenario.clone()),
            Slot::Idle => None,
        }
    }
}

/// Drive a workload through every step
async fn run_scenario(
    participant: ParticipantId,
    run_id: u64,
    config: &ScenarioConfig,
    mut workload: Box<dyn Workload>,
    sink: Arc<dyn MessageSink>,
    cancel: &CancellationToken,
) -> RunOutcome {
    let total = config.total_steps();
    let interval = workload.step_interval(config);
    let started = Instant::now();

    for step in 1..=total {
        if cancel.is_cancelled() {
            return RunOutcome::Cancelled;
        }
        tokio::select! {
            _ = cancel.cancelled() => return RunOutcome::Cancelled,
            _ = tokio::time::sleep(interval) => {}
        }

        let ctx = StepContext {
            step,
            total,
            elapsed: started.elapsed(),
        };
        let result = workload.step(config, ctx);

        let progress = Message::ScenarioProgress {
            participant,
            scenario: config.name.clone(),
            run_id,
            step,
            total_steps: total,
        };
        if sink.send(progress).await.is_err() {
            return RunOutcome::Disconnected;
        }

        if ctx.is_final() {
            let result = result.unwrap_or_else(|| {
                tracing::warn!("{} produced no result on its final step", config.name);
                ResultPayload {
                    success: false,
                    ..ResultPayload::elapsed(ctx.elapsed.as_secs_f64())
                }
            });
            let message = Message::ScenarioResult {
                participant,
                scenario: config.name.clone(),
                run_id,
                result,
            };
            if sink.send(message).await.is_err() {
                return RunOutcome::Disconnected;
            }
            return RunOutcome::Completed;
        }
    }

    RunOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pc_protocol::Params;
    use tokio::sync::mpsc;

    /// Finishes on the last step with the elapsed time
    struct Stopwatch;

    impl Workload for Stopwatch {
        fn step(&mut self, _: &ScenarioConfig, ctx: StepContext) -> Option<ResultPayload> {
            ctx.is_final()
                .then(|| ResultPayload::elapsed(ctx.elapsed.as_secs_f64()))
        }
    }

    struct StopwatchFactory;

    impl WorkloadFactory for StopwatchFactory {
        fn create(&self, _: &ScenarioConfig) -> Box<dyn Workload> {
            Box::new(Stopwatch)
        }
    }

    /// Never yields a result
    struct Forgetful;

    impl Workload for Forgetful {
        fn step(&mut self, _: &ScenarioConfig, _: StepContext) -> Option<ResultPayload> {
            None
        }
    }

    struct ForgetfulFactory;

    impl WorkloadFactory for ForgetfulFactory {
        fn create(&self, _: &ScenarioConfig) -> Box<dyn Workload> {
            Box::new(Forgetful)
        }
    }

    fn config(steps: u32, duration_secs: u64) -> ScenarioConfig {
        ScenarioConfig {
            name: "ai_showdown".into(),
            duration_secs,
            step_count: steps,
            params: Params::new(),
        }
    }

    fn executor() -> Executor {
        Executor::new(ParticipantId::Snapdragon, Arc::new(StopwatchFactory))
    }

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_progress_then_one_result() {
        let executor = executor();
        let (tx, mut rx) = mpsc::channel::<Message>(64);

        let handle = executor.start(7, config(4, 8), Arc::new(tx)).await.unwrap();
        assert!(executor.current().await.is_some());
        assert_eq!(handle.await.unwrap(), RunOutcome::Completed);

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 5);
        for (i, message) in messages[..4].iter().enumerate() {
            match message {
                Message::ScenarioProgress {
                    step,
                    total_steps,
                    run_id,
                    ..
                } => {
                    assert_eq!(*step, i as u32 + 1);
                    assert_eq!(*total_steps, 4);
                    assert_eq!(*run_id, 7);
                }
                other => panic!("Expected progress, got {:?}", other),
            }
        }
        match &messages[4] {
            Message::ScenarioResult { run_id, result, .. } => {
                assert_eq!(*run_id, 7);
                assert!(result.success);
                assert_eq!(result.elapsed_secs, 8.0);
            }
            other => panic!("Expected result, got {:?}", other),
        }

        assert!(executor.current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_executing_is_busy() {
        let executor = executor();
        let (tx, _rx) = mpsc::channel::<Message>(64);
        let sink: Arc<dyn MessageSink> = Arc::new(tx);

        executor
            .start(1, config(10, 100), Arc::clone(&sink))
            .await
            .unwrap();
        let err = executor.start(2, config(10, 100), sink).await.unwrap_err();
        assert!(matches!(err, AgentError::Busy(ref name) if name == "ai_showdown"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_without_result() {
        let executor = executor();
        let (tx, mut rx) = mpsc::channel::<Message>(64);

        let handle = executor
            .start(3, config(10, 10), Arc::new(tx))
            .await
            .unwrap();

        // Let three steps complete
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert!(executor.stop().await);
        assert_eq!(handle.await.unwrap(), RunOutcome::Cancelled);

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 3);
        assert!(messages
            .iter()
            .all(|m| matches!(m, Message::ScenarioProgress { .. })));
        assert!(executor.current().await.is_none());
        assert!(!executor.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let executor = executor();
        let (tx, mut rx) = mpsc::channel::<Message>(64);
        let sink: Arc<dyn MessageSink> = Arc::new(tx);

        let first = executor
            .start(1, config(10, 100), Arc::clone(&sink))
            .await
            .unwrap();
        executor.stop().await;
        let second = executor.start(2, config(2, 2), sink).await.unwrap();

        assert_eq!(first.await.unwrap(), RunOutcome::Cancelled);
        assert_eq!(second.await.unwrap(), RunOutcome::Completed);

        let results: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|m| match m {
                Message::ScenarioResult { run_id, .. } => Some(run_id),
                _ => None,
            })
            .collect();
        assert_eq!(results, vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_result_reported_as_failure() {
        let executor = Executor::new(ParticipantId::Intel, Arc::new(ForgetfulFactory));
        let (tx, mut rx) = mpsc::channel::<Message>(64);

        let handle = executor.start(5, config(1, 1), Arc::new(tx)).await.unwrap();
        assert_eq!(handle.await.unwrap(), RunOutcome::Completed);

        match drain(&mut rx).pop() {
            Some(Message::ScenarioResult { result, .. }) => assert!(!result.success),
            other => panic!("Expected result, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_sink_ends_run() {
        let executor = executor();
        let (tx, rx) = mpsc::channel::<Message>(64);
        drop(rx);

        let handle = executor.start(9, config(3, 3), Arc::new(tx)).await.unwrap();
        assert_eq!(handle.await.unwrap(), RunOutcome::Disconnected);
        assert!(executor.current().await.is_none());
    }
}
