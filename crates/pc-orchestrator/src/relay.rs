//! Metrics relay
//!
//! Stores a sample, fans it out, then derives commentary from it. The
//! commentary for a sample is always published after that sample.

use pc_core::ipc::{metrics_to_json, CommentaryEntry, IpcEvent};
use pc_core::time::current_time_millis;
use pc_core::ConnectionStatus;
use pc_protocol::{Metrics, ParticipantId};

use crate::commentary;
use crate::state::OrchestratorState;

/// Ingest one metrics sample
pub async fn relay_metrics(
    state: &OrchestratorState,
    id: ParticipantId,
    metrics: Metrics,
    timestamp: u64,
) {
    let now = current_time_millis();

    match state.registry.update_metrics(id, metrics.clone(), now) {
        Ok(revived) => {
            if revived {
                tracing::info!("{} reporting again, marking connected", id);
                state.events.publish(IpcEvent::DeviceStatus {
                    device: id,
                    status: ConnectionStatus::Connected,
                    timestamp: now,
                });
            }
        }
        Err(e) => {
            tracing::warn!("Dropping metrics sample: {}", e);
            return;
        }
    }

    tracing::debug!("Metrics from {}: {} readings", id, metrics.len());
    state.events.publish(IpcEvent::MetricsBroadcast {
        device: id,
        metrics: metrics_to_json(&metrics),
        timestamp,
    });

    for line in commentary::generate(id, &metrics, &state.config.commentary) {
        let entry = CommentaryEntry::auto(line, now);
        state.coordinator.append_commentary(entry.clone()).await;
        state.events.publish(IpcEvent::CommentaryUpdate(entry));
    }
}
