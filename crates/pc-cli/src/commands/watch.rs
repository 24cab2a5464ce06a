//! Live event stream

use anyhow::Result;

use crate::ipc::OrchestratorClient;
use crate::output::{format_event, print_info, print_warning};

/// Print events as they arrive until Ctrl+C or the orchestrator goes away
pub async fn watch_command(client: &mut OrchestratorClient, include_metrics: bool) -> Result<()> {
    client.connect().await?;
    print_info(&format!(
        "Watching orchestrator at {} (Ctrl+C to exit)",
        client.address()
    ));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = client.next_event() => match event? {
                Some(event) => {
                    if let Some(line) = format_event(&event, include_metrics) {
                        println!("{}", line);
                    }
                }
                None => {
                    print_warning("Orchestrator closed the connection");
                    break;
                }
            },
        }
    }

    Ok(())
}
