//! Observer event fan-out

use tokio::sync::broadcast;

use pc_core::ipc::IpcEvent;

/// Default channel depth; slower observers skip events past this
pub const EVENT_CAPACITY: usize = 1024;

/// Broadcasts events to every connected observer.
///
/// Publishing never blocks: a lagging observer loses the oldest events and
/// is told how many it missed.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IpcEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send an event to all current subscribers
    pub fn publish(&self, event: IpcEvent) {
        // No observers connected is not an error
        if self.tx.send(event).is_err() {
            tracing::trace!("Event dropped: no observers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IpcEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}
