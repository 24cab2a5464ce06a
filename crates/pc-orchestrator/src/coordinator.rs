//! Scenario state machine
//!
//! `Idle -> Running -> Aggregating -> Idle`. All state lives behind one
//! async mutex; every method takes the lock, mutates, and returns what the
//! caller needs to publish or dispatch. No I/O happens under the lock.

use std::collections::BTreeMap;
use tokio::sync::Mutex;

use pc_core::config::{ComparisonRule, ScenarioDefinition};
use pc_core::error::ScenarioError;
use pc_core::ipc::{CommentaryEntry, DemoStatus, ResultEntry, Verdict};
use pc_core::DemoPhase;
use pc_protocol::{Measurement, ParticipantId, ResultPayload, ScenarioConfig};

use crate::commentary::CommentaryRing;
use crate::winner::{announce, determine_winner};

/// Mutable demo state
#[derive(Debug, Default)]
struct DemoState {
    phase: DemoPhase,
    current_scenario: Option<String>,
    run_id: Option<u64>,
    started_at: Option<u64>,
    results: Vec<ResultEntry>,
    commentary: CommentaryRing,
    last_run_id: u64,
}

impl DemoState {
    fn is_current(&self, scenario: &str, run_id: u64) -> bool {
        self.phase.is_active()
            && self.run_id == Some(run_id)
            && self.current_scenario.as_deref() == Some(scenario)
    }
}

/// A run that was just started
#[derive(Debug, Clone)]
pub struct StartedRun {
    pub run_id: u64,
    pub config: ScenarioConfig,
}

/// A run that was just abandoned
#[derive(Debug, Clone, PartialEq)]
pub struct StoppedRun {
    pub scenario: Option<String>,
    pub run_id: Option<u64>,
}

/// What happened to a submitted result
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOutcome {
    /// Stored; the run is still waiting for others
    Accepted,
    /// Stored and it completed the run
    Completed(Verdict),
    /// Ignored
    Dropped(&'static str),
}

/// Owns the scenario state machine and commentary history
pub struct DemoCoordinator {
    state: Mutex<DemoState>,
    scenarios: BTreeMap<String, ScenarioDefinition>,
    expected: Vec<ParticipantId>,
}

impl DemoCoordinator {
    /// `expected` is the fixed set a run waits for
    pub fn new(
        scenarios: BTreeMap<String, ScenarioDefinition>,
        mut expected: Vec<ParticipantId>,
    ) -> Self {
        expected.sort();
        expected.dedup();
        Self {
            state: Mutex::new(DemoState::default()),
            scenarios,
            expected,
        }
    }

    pub fn scenarios(&self) -> &BTreeMap<String, ScenarioDefinition> {
        &self.scenarios
    }

    pub fn expected(&self) -> &[ParticipantId] {
        &self.expected
    }

    /// Begin a run. Rejections leave the state untouched.
    pub async fn start(&self, name: &str, now: u64) -> Result<StartedRun, ScenarioError> {
        let definition = self
            .scenarios
            .get(name)
            .ok_or_else(|| ScenarioError::UnknownScenario(name.to_string()))?;

        let mut state = self.state.lock().await;
        if state.phase.is_active() {
            return Err(ScenarioError::AlreadyRunning(
                state.current_scenario.clone().unwrap_or_default(),
            ));
        }

        state.last_run_id += 1;
        let run_id = state.last_run_id;
        state.phase = DemoPhase::Running;
        state.current_scenario = Some(name.to_string());
        state.run_id = Some(run_id);
        state.started_at = Some(now);
        state.results.clear();

        Ok(StartedRun {
            run_id,
            config: definition.to_config(name),
        })
    }

    /// Collect a terminal result
    pub async fn record_result(
        &self,
        participant: ParticipantId,
        scenario: &str,
        run_id: u64,
        result: ResultPayload,
        now: u64,
    ) -> ResultOutcome {
        let mut state = self.state.lock().await;

        if !state.phase.is_active() {
            return ResultOutcome::Dropped("no run in progress");
        }
        if !state.is_current(scenario, run_id) {
            return ResultOutcome::Dropped("result belongs to another run");
        }
        if !self.expected.contains(&participant) {
            return ResultOutcome::Dropped("participant is not expected in this run");
        }
        if state.results.iter().any(|r| r.device == participant) {
            return ResultOutcome::Dropped("participant already reported");
        }

        state.results.push(ResultEntry {
            device: participant,
            result,
            timestamp: now,
        });
        state.phase = DemoPhase::Aggregating;

        let complete = self
            .expected
            .iter()
            .all(|id| state.results.iter().any(|r| r.device == *id));
        if complete {
            ResultOutcome::Completed(self.finish(&mut state, now))
        } else {
            ResultOutcome::Accepted
        }
    }

    /// Force a verdict with the results collected so far
    pub async fn conclude(&self, now: u64) -> Result<Verdict, ScenarioError> {
        let mut state = self.state.lock().await;
        match state.phase {
            DemoPhase::Idle => Err(ScenarioError::NotRunning),
            DemoPhase::Running => Err(ScenarioError::NotAggregating),
            DemoPhase::Aggregating => Ok(self.finish(&mut state, now)),
        }
    }

    /// Abandon the run without a verdict
    pub async fn stop(&self) -> Result<StoppedRun, ScenarioError> {
        let mut state = self.state.lock().await;
        if !state.phase.is_active() {
            return Err(ScenarioError::NotRunning);
        }

        state.phase = DemoPhase::Idle;
        state.results.clear();
        state.started_at = None;
        Ok(StoppedRun {
            scenario: state.current_scenario.take(),
            run_id: state.run_id.take(),
        })
    }

    /// Whether progress for this run should reach observers
    pub async fn is_current(&self, scenario: &str, run_id: u64) -> bool {
        self.state.lock().await.is_current(scenario, run_id)
    }

    pub async fn status(&self) -> DemoStatus {
        let state = self.state.lock().await;
        DemoStatus {
            active: state.phase.is_active(),
            phase: state.phase,
            current_scenario: state.current_scenario.clone(),
            run_id: state.run_id,
            started_at: state.started_at,
            results: state.results.clone(),
        }
    }

    pub async fn append_commentary(&self, entry: CommentaryEntry) {
        self.state.lock().await.commentary.push(entry);
    }

    pub async fn commentary(&self) -> Vec<CommentaryEntry> {
        self.state.lock().await.commentary.to_vec()
    }

    /// Score the run and return to Idle. The scenario name stays visible.
    fn finish(&self, state: &mut DemoState, now: u64) -> Verdict {
        let scenario = state.current_scenario.clone().unwrap_or_default();
        let run_id = state.run_id.unwrap_or_default();
        let definition = self.scenarios.get(&scenario);

        let results: Vec<_> = state
            .results
            .iter()
            .map(|r| (r.device, r.result.clone()))
            .collect();

        let rule = definition
            .map(|d| d.rule)
            .unwrap_or(ComparisonRule::minimize(Measurement::ElapsedTime));
        let victory_lines = definition.map_or(&[][..], |d| d.victory_messages.as_slice());

        let outcome = determine_winner(&rule, &self.expected, &results);
        let message = announce(&outcome, victory_lines, &mut rand::thread_rng());

        state.phase = DemoPhase::Idle;
        state.results.clear();

        Verdict {
            scenario,
            run_id,
            winner: outcome.winner,
            ratio: outcome.ratio,
            message,
            standings: outcome.standings,
            timestamp: now,
        }
    }
}
