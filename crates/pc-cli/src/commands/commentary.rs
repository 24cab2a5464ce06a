//! Commentary command implementation

use anyhow::Result;

use crate::ipc::OrchestratorClient;
use crate::output::{format_commentary, print_error};

/// Print the commentary history, keeping only the last `limit` lines if set
pub async fn commentary_command(client: &mut OrchestratorClient, limit: Option<usize>) -> Result<()> {
    let mut entries = match client.commentary().await {
        Ok(e) => e,
        Err(e) => {
            print_error(&format!("Failed to get commentary: {}", e));
            return Err(e);
        }
    };

    if let Some(limit) = limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    println!("{}", format_commentary(&entries));

    Ok(())
}
