//! Connection pool implementation

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use pc_protocol::{Message, ParticipantId, ScenarioConfig};

/// Commands the orchestrator sends to a connected agent
#[derive(Debug, Clone)]
pub enum AgentCommand {
    /// Begin a run
    StartScenario { run_id: u64, config: ScenarioConfig },
    /// Abandon the in-flight run
    StopScenario,
}

impl AgentCommand {
    /// Convert to the wire message
    pub fn to_message(&self) -> Message {
        match self {
            AgentCommand::StartScenario { run_id, config } => Message::ScenarioStart {
                run_id: *run_id,
                config: config.clone(),
            },
            AgentCommand::StopScenario => Message::ScenarioStop,
        }
    }
}

/// Live session to one agent
pub struct AgentLink {
    pub participant: ParticipantId,
    /// Distinguishes sessions when an agent reconnects
    pub connection_id: u64,
    command_tx: mpsc::Sender<AgentCommand>,
    cancel: CancellationToken,
}

impl AgentLink {
    pub fn new(
        participant: ParticipantId,
        connection_id: u64,
        command_tx: mpsc::Sender<AgentCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            participant,
            connection_id,
            command_tx,
            cancel,
        }
    }

    /// Queue a command for the session writer without waiting.
    ///
    /// Fails when the session is gone or its queue is full because the
    /// agent stopped reading.
    pub fn try_send(&self, command: AgentCommand) -> Result<(), TrySendError<AgentCommand>> {
        self.command_tx.try_send(command)
    }

    /// Close the session
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

/// Pool of live agent sessions, at most one per participant
pub struct ConnectionPool {
    links: DashMap<ParticipantId, Arc<AgentLink>>,
    next_id: AtomicU64,
}

impl ConnectionPool {
    /// Create a new empty connection pool
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a new session
    pub fn next_connection_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a link, closing and returning any older session for the same participant
    pub fn insert(&self, link: AgentLink) -> Option<Arc<AgentLink>> {
        let previous = self.links.insert(link.participant, Arc::new(link));
        if let Some(old) = &previous {
            tracing::info!(
                "Replacing session {} for {}",
                old.connection_id,
                old.participant
            );
            old.disconnect();
        }
        previous
    }

    /// Remove a link only if it is still the given session
    pub fn remove_if_current(
        &self,
        participant: ParticipantId,
        connection_id: u64,
    ) -> Option<Arc<AgentLink>> {
        self.links
            .remove_if(&participant, |_, link| link.connection_id == connection_id)
            .map(|(_, link)| link)
    }

    /// List all links in canonical order
    pub fn list(&self) -> Vec<Arc<AgentLink>> {
        let mut links: Vec<_> = self.links.iter().map(|r| Arc::clone(&r)).collect();
        links.sort_by_key(|l| l.participant);
        links
    }

    /// Queue a command on every live session, returning who received it.
    ///
    /// A stalled session is skipped rather than waited on, so one agent
    /// cannot hold up the others.
    pub fn broadcast(&self, command: AgentCommand) -> Vec<ParticipantId> {
        let mut reached = Vec::new();
        for link in self.list() {
            match link.try_send(command.clone()) {
                Ok(()) => reached.push(link.participant),
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Command queue for {} is full, command not sent",
                        link.participant
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!("Session for {} is gone, command not sent", link.participant);
                }
            }
        }
        reached
    }

    /// Number of active connections
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if pool is empty
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_protocol::Params;

    fn link(
        pool: &ConnectionPool,
        participant: ParticipantId,
    ) -> (AgentLink, mpsc::Receiver<AgentCommand>, CancellationToken) {
        link_with_capacity(pool, participant, 8)
    }

    fn link_with_capacity(
        pool: &ConnectionPool,
        participant: ParticipantId,
        capacity: usize,
    ) -> (AgentLink, mpsc::Receiver<AgentCommand>, CancellationToken) {
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        let link = AgentLink::new(participant, pool.next_connection_id(), tx, cancel.clone());
        (link, rx, cancel)
    }

    #[test]
    fn test_command_to_message() {
        let config = ScenarioConfig {
            name: "ai_showdown".into(),
            duration_secs: 30,
            step_count: 20,
            params: Params::new(),
        };
        let msg = AgentCommand::StartScenario {
            run_id: 9,
            config: config.clone(),
        }
        .to_message();
        assert_eq!(msg, Message::ScenarioStart { run_id: 9, config });
        assert_eq!(AgentCommand::StopScenario.to_message(), Message::ScenarioStop);
    }

    #[test]
    fn test_newer_session_replaces_older() {
        let pool = ConnectionPool::new();
        let (first, _rx1, first_cancel) = link(&pool, ParticipantId::Intel);
        let first_id = first.connection_id;
        assert!(pool.insert(first).is_none());

        let (second, _rx2, _) = link(&pool, ParticipantId::Intel);
        let second_id = second.connection_id;
        let replaced = pool.insert(second).unwrap();
        assert_eq!(replaced.connection_id, first_id);
        assert!(first_cancel.is_cancelled());
        assert_eq!(pool.len(), 1);

        // The old session closing must not evict the new one
        assert!(pool
            .remove_if_current(ParticipantId::Intel, first_id)
            .is_none());
        assert_eq!(pool.list()[0].connection_id, second_id);
        assert!(pool
            .remove_if_current(ParticipantId::Intel, second_id)
            .is_some());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reports_reached_sessions() {
        let pool = ConnectionPool::new();
        let (snap, mut snap_rx, _) = link(&pool, ParticipantId::Snapdragon);
        let (intel, intel_rx, _) = link(&pool, ParticipantId::Intel);
        pool.insert(snap);
        pool.insert(intel);
        drop(intel_rx);

        let reached = pool.broadcast(AgentCommand::StopScenario);
        assert_eq!(reached, vec![ParticipantId::Snapdragon]);
        assert!(matches!(
            snap_rx.recv().await,
            Some(AgentCommand::StopScenario)
        ));
    }

    #[test]
    fn test_stalled_session_does_not_block_others() {
        let pool = ConnectionPool::new();
        let (snap, mut snap_rx, _) = link_with_capacity(&pool, ParticipantId::Snapdragon, 1);
        let (intel, mut intel_rx, _) = link(&pool, ParticipantId::Intel);
        // Snapdragon's agent stopped reading; its queue is already full
        snap.try_send(AgentCommand::StopScenario).unwrap();
        pool.insert(snap);
        pool.insert(intel);

        let reached = pool.broadcast(AgentCommand::StopScenario);
        assert_eq!(reached, vec![ParticipantId::Intel]);
        assert!(matches!(
            intel_rx.try_recv(),
            Ok(AgentCommand::StopScenario)
        ));
        // Only the command queued before the stall is pending
        assert!(snap_rx.try_recv().is_ok());
        assert!(snap_rx.try_recv().is_err());
    }
}
