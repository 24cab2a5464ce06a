//! Participant and scenario listings

use anyhow::Result;

use crate::ipc::OrchestratorClient;
use crate::output::{format_devices, format_scenarios, print_error};

/// Execute the devices command
pub async fn devices_command(client: &mut OrchestratorClient, long: bool) -> Result<()> {
    let devices = match client.devices().await {
        Ok(d) => d,
        Err(e) => {
            print_error(&format!("Failed to list participants: {}", e));
            return Err(e);
        }
    };

    let connected = devices
        .iter()
        .filter(|d| d.status == pc_core::ConnectionStatus::Connected)
        .count();

    println!("Participants ({}/{} connected):", connected, devices.len());
    println!("{}", format_devices(&devices, long));

    Ok(())
}

/// Execute the scenarios command
pub async fn scenarios_command(client: &mut OrchestratorClient) -> Result<()> {
    let scenarios = match client.scenarios().await {
        Ok(s) => s,
        Err(e) => {
            print_error(&format!("Failed to list scenarios: {}", e));
            return Err(e);
        }
    };

    println!("Scenarios:");
    println!("{}", format_scenarios(&scenarios));

    Ok(())
}
