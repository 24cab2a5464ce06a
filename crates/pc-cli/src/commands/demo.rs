//! Demo control: start, stop and conclude a scenario run

use anyhow::Result;

use crate::ipc::{IpcEvent, OrchestratorClient};
use crate::output::{format_event, format_verdict, print_error, print_info, print_success, print_warning};

/// Start a scenario, optionally following it until the verdict
pub async fn start_command(client: &mut OrchestratorClient, scenario: &str, wait: bool) -> Result<()> {
    let started = match client.start_demo(scenario).await {
        Ok(s) => s,
        Err(e) => {
            print_error(&format!("Failed to start {}: {}", scenario, e));
            return Err(e);
        }
    };

    print_success(&format!(
        "Started {} (run {})",
        started.scenario, started.run_id
    ));

    if started.dispatched.is_empty() {
        print_warning("No participants are connected; conclude or stop the run when ready");
    } else {
        let names: Vec<_> = started
            .dispatched
            .iter()
            .map(|p| p.display_name())
            .collect();
        print_info(&format!("Dispatched to: {}", names.join(", ")));
    }

    if !wait {
        return Ok(());
    }

    loop {
        match client.next_event().await? {
            Some(IpcEvent::WinnerDeclared(verdict)) if verdict.run_id == started.run_id => {
                print!("{}", format_verdict(&verdict));
                return Ok(());
            }
            Some(IpcEvent::ScenarioStopped { run_id, .. }) if run_id == Some(started.run_id) => {
                print_warning("Run was stopped before a verdict");
                return Ok(());
            }
            Some(event) => {
                if let Some(line) = format_event(&event, false) {
                    println!("{}", line);
                }
            }
            None => anyhow::bail!("Orchestrator closed the connection before a verdict"),
        }
    }
}

/// Abandon the current run
pub async fn stop_command(client: &mut OrchestratorClient) -> Result<()> {
    match client.stop_demo().await {
        Ok(()) => {
            print_success("Scenario stopped");
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Failed to stop scenario: {}", e));
            Err(e)
        }
    }
}

/// Force a verdict with the results collected so far
pub async fn conclude_command(client: &mut OrchestratorClient) -> Result<()> {
    match client.conclude_demo().await {
        Ok(()) => {
            print_success("Scenario concluded");
            Ok(())
        }
        Err(e) => {
            print_error(&format!("Failed to conclude scenario: {}", e));
            Err(e)
        }
    }
}
