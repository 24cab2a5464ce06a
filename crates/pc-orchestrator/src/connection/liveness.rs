//! Liveness monitoring
//!
//! Periodically demotes participants that have gone quiet. Only entries
//! that registered at some point are ever evaluated.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use pc_core::ipc::IpcEvent;
use pc_core::time::current_time_millis;
use pc_core::ConnectionStatus;
use pc_protocol::ParticipantId;

use crate::events::EventBus;
use crate::registry::DeviceRegistry;

/// Marks silent participants disconnected
pub struct LivenessMonitor {
    registry: Arc<DeviceRegistry>,
    events: EventBus,
    /// How often to check
    pub interval: Duration,
    /// Silence tolerated before demotion
    pub threshold: Duration,
}

impl LivenessMonitor {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        events: EventBus,
        interval: Duration,
        threshold: Duration,
    ) -> Self {
        Self {
            registry,
            events,
            interval,
            threshold,
        }
    }

    /// One evaluation pass; publishes a status event per demotion
    pub fn check_once(&self, now: u64) -> Vec<ParticipantId> {
        let demoted = self.registry.sweep_stale(now, self.threshold);
        for id in &demoted {
            tracing::warn!("{} silent for over {:?}, marking disconnected", id, self.threshold);
            self.events.publish(IpcEvent::DeviceStatus {
                device: *id,
                status: ConnectionStatus::Disconnected,
                timestamp: now,
            });
        }
        demoted
    }

    /// Run until cancelled
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Liveness monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.check_once(current_time_millis());
                    }
                }
            }
        })
    }
}
