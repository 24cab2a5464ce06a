//! CLI integration tests
//!
//! Tests the perf-championship CLI using assert_cmd. Commands that talk to
//! an orchestrator get one started in-process on ephemeral ports.

use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use pc_agent::Agent;
use pc_core::config::{AgentConfig, OrchestratorConfig, Range, RetryConfig};
use pc_orchestrator::Orchestrator;
use pc_protocol::ParticipantId;

fn perf_championship() -> Command {
    Command::cargo_bin("perf-championship")
        .expect("Failed to locate perf-championship binary - ensure it's built before running tests")
}

/// An orchestrator running on its own runtime for the duration of a test
struct LiveOrchestrator {
    runtime: Runtime,
    cancel: CancellationToken,
    agent_addr: String,
    ipc_addr: String,
}

impl LiveOrchestrator {
    fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let cancel = CancellationToken::new();

        let config = OrchestratorConfig {
            bind_address: "127.0.0.1:0".into(),
            ipc_port: 0,
            ..OrchestratorConfig::default()
        };
        let orchestrator = runtime
            .block_on(Orchestrator::bind(config, cancel.clone()))
            .unwrap();
        let agent_addr = orchestrator.agent_addr().to_string();
        let ipc_addr = orchestrator.ipc_addr().to_string();
        runtime.spawn(orchestrator.run());

        Self {
            runtime,
            cancel,
            agent_addr,
            ipc_addr,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = perf_championship();
        cmd.args(["--ipc", &self.ipc_addr]);
        cmd
    }

    /// Join a simulated agent whose AI workload takes `seconds`
    fn join(&self, participant: ParticipantId, seconds: f64) {
        let mut config = AgentConfig {
            orchestrator_address: self.agent_addr.clone(),
            retry: RetryConfig {
                max_attempts: 3,
                backoff_step: Duration::from_millis(50),
            },
            metrics_interval: Duration::from_millis(200),
            ..AgentConfig::default()
        };
        let mut profile = config.device_profile(participant);
        profile.simulation.ai_seconds = Range::new(seconds, seconds);
        config.device = Some(profile);

        self.runtime
            .spawn(Agent::new(config, participant).run(self.cancel.clone()));
    }

    fn wait_for_connected(&self, count: usize) {
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        loop {
            let output = self.command().arg("status").output().unwrap();
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.contains(&format!("Connected Participants: {}", count)) {
                return;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "participants never connected:\n{}",
                stdout
            );
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

impl Drop for LiveOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[test]
fn test_cli_help() {
    perf_championship()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("perf-championship"))
        .stdout(predicate::str::contains("performance championship"));
}

#[test]
fn test_cli_version() {
    perf_championship()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("perf-championship"));
}

#[test]
fn test_cli_serve_help() {
    perf_championship()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orchestrator"));
}

#[test]
fn test_cli_join_help() {
    perf_championship()
        .args(["join", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agent"));
}

#[test]
fn test_cli_unknown_command() {
    perf_championship()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_start_requires_scenario() {
    perf_championship().arg("start").assert().failure();
}

#[test]
fn test_cli_join_rejects_unknown_participant() {
    perf_championship()
        .args(["join", "127.0.0.1:1", "--participant", "amd"])
        .assert()
        .failure();
}

#[test]
fn test_cli_config_path_per_target() {
    perf_championship()
        .args(["config", "--target", "agent", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agent.toml"));
}

#[test]
fn test_cli_config_init_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orchestrator.toml");
    let path = path.to_str().unwrap();

    perf_championship()
        .args(["--config", path, "config", "init"])
        .assert()
        .success();

    perf_championship()
        .args(["--config", path, "config", "set", "ipc_port", "6060"])
        .assert()
        .success();

    perf_championship()
        .args(["--config", path, "config", "get", "ipc_port"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6060"));
}

#[test]
fn test_cli_status_without_orchestrator() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    perf_championship()
        .args(["--ipc", &address, "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Is the orchestrator running?"));
}

#[test]
fn test_cli_status_idle() {
    let live = LiveOrchestrator::start();

    live.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Orchestrator Status: Running"))
        .stdout(predicate::str::contains("Demo Phase: idle"));
}

#[test]
fn test_cli_devices_and_scenarios() {
    let live = LiveOrchestrator::start();

    live.command()
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("0/2 connected"))
        .stdout(predicate::str::contains("snapdragon"))
        .stdout(predicate::str::contains("intel"));

    live.command()
        .arg("scenarios")
        .assert()
        .success()
        .stdout(predicate::str::contains("ai_showdown"))
        .stdout(predicate::str::contains("battery_race"))
        .stdout(predicate::str::contains("thermal_test"));
}

#[test]
fn test_cli_demo_control_errors() {
    let live = LiveOrchestrator::start();

    live.command()
        .arg("stop")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No scenario is running"));

    live.command()
        .arg("conclude")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No scenario is running"));

    live.command()
        .args(["start", "drag_race"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown scenario"));
}

#[test]
fn test_cli_start_without_participants_then_stop() {
    let live = LiveOrchestrator::start();

    live.command()
        .args(["start", "battery_race"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started battery_race"))
        .stderr(predicate::str::contains("No participants are connected"));

    live.command()
        .args(["start", "ai_showdown"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already running"));

    live.command()
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario stopped"));
}

#[test]
fn test_cli_start_and_wait_for_winner() {
    let live = LiveOrchestrator::start();
    live.join(ParticipantId::Snapdragon, 0.3);
    live.join(ParticipantId::Intel, 0.9);
    live.wait_for_connected(2);

    live.command()
        .args(["start", "ai_showdown", "--wait"])
        .timeout(Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("Dispatched to: Snapdragon, Intel"))
        .stdout(predicate::str::contains("Snapdragon wins"))
        .stdout(predicate::str::is_match(r"Snapdragon: 0\.\d \*").unwrap())
        .stdout(predicate::str::is_match(r"Intel: \d\.\d\n").unwrap());

    live.command()
        .args(["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scenario: ai_showdown"));
}
