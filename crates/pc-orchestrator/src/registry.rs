//! Device registry
//!
//! One entry per participant that has ever registered, keyed by id. Entries
//! are created only by registration; every other operation on an unknown id
//! is an error. Each entry sits behind its own DashMap shard lock, so a
//! snapshot never observes a half-applied update.

use dashmap::DashMap;
use std::time::Duration;

use pc_core::error::RegistryError;
use pc_core::time::is_stale;
use pc_core::HostInfo;
use pc_protocol::{Metrics, ParticipantId};

/// Registry view of one participant
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantState {
    pub id: ParticipantId,
    pub connected: bool,
    /// Milliseconds since the Unix epoch
    pub last_seen: Option<u64>,
    pub latest_metrics: Option<Metrics>,
    pub host: Option<HostInfo>,
    /// Transport session that last registered this participant
    pub session: Option<u64>,
}

impl ParticipantState {
    fn new(id: ParticipantId) -> Self {
        Self {
            id,
            connected: false,
            last_seen: None,
            latest_metrics: None,
            host: None,
            session: None,
        }
    }
}

/// Connection status and latest readings of every participant
#[derive(Default)]
pub struct DeviceRegistry {
    entries: DashMap<ParticipantId, ParticipantState>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a participant connected on `session`.
    ///
    /// Returns true when this is a transition into `connected`.
    pub fn register(&self, id: ParticipantId, session: u64, host: HostInfo, now: u64) -> bool {
        let mut entry = self
            .entries
            .entry(id)
            .or_insert_with(|| ParticipantState::new(id));
        let transitioned = !entry.connected;
        entry.connected = true;
        entry.last_seen = Some(now);
        entry.host = Some(host);
        entry.session = Some(session);
        transitioned
    }

    /// Store the latest metrics sample.
    ///
    /// A sample from a disconnected participant revives it; returns true in
    /// that case.
    pub fn update_metrics(
        &self,
        id: ParticipantId,
        metrics: Metrics,
        now: u64,
    ) -> Result<bool, RegistryError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(RegistryError::UnknownParticipant(id))?;
        let revived = !entry.connected;
        entry.connected = true;
        entry.last_seen = Some(now);
        entry.latest_metrics = Some(metrics);
        Ok(revived)
    }

    /// Refresh last-seen on any other message; revives like a metrics sample
    pub fn touch(&self, id: ParticipantId, now: u64) -> Result<bool, RegistryError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or(RegistryError::UnknownParticipant(id))?;
        let revived = !entry.connected;
        entry.connected = true;
        entry.last_seen = Some(now);
        Ok(revived)
    }

    /// Transport `session` closed. Returns true when this is a transition.
    ///
    /// A session that has since been superseded by a newer registration
    /// leaves the entry alone.
    pub fn mark_disconnected(&self, id: ParticipantId, session: u64) -> bool {
        match self.entries.get_mut(&id) {
            Some(mut entry) if entry.connected && entry.session == Some(session) => {
                entry.connected = false;
                true
            }
            _ => false,
        }
    }

    /// Demote every connected entry silent for longer than `threshold`.
    ///
    /// Returns the demoted ids in canonical order; an entry is reported
    /// once per transition.
    pub fn sweep_stale(&self, now: u64, threshold: Duration) -> Vec<ParticipantId> {
        let mut demoted = Vec::new();
        for mut entry in self.entries.iter_mut() {
            let stale = entry
                .last_seen
                .map_or(true, |seen| is_stale(seen, now, threshold));
            if entry.connected && stale {
                entry.connected = false;
                demoted.push(entry.id);
            }
        }
        demoted.sort();
        demoted
    }

    /// Copy of one entry
    pub fn get(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.entries.get(&id).map(|e| e.clone())
    }

    /// Copy of every entry in canonical order
    pub fn snapshot(&self) -> Vec<ParticipantState> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.clone()).collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    pub fn connected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.connected).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_protocol::Primitive;

    fn host() -> HostInfo {
        HostInfo {
            hostname: "galaxy-book".into(),
            os: "windows".into(),
            arch: "aarch64".into(),
            version: Some("1.0".into()),
        }
    }

    fn sample(temp: f64) -> Metrics {
        let mut m = Metrics::new();
        m.insert("temperature".into(), Primitive::Float(temp));
        m
    }

    #[test]
    fn test_register_twice_single_entry() {
        let registry = DeviceRegistry::new();
        assert!(registry.register(ParticipantId::Snapdragon, 1, host(), 1_000));
        assert!(!registry.register(ParticipantId::Snapdragon, 1, host(), 2_000));

        assert_eq!(registry.len(), 1);
        let entry = registry.get(ParticipantId::Snapdragon).unwrap();
        assert!(entry.connected);
        assert_eq!(entry.last_seen, Some(2_000));
    }

    #[test]
    fn test_latest_metrics_is_last_sample() {
        let registry = DeviceRegistry::new();
        registry.register(ParticipantId::Intel, 1, host(), 0);
        registry
            .update_metrics(ParticipantId::Intel, sample(70.0), 1)
            .unwrap();
        registry
            .update_metrics(ParticipantId::Intel, sample(78.5), 2)
            .unwrap();

        let entry = registry.get(ParticipantId::Intel).unwrap();
        assert_eq!(entry.latest_metrics, Some(sample(78.5)));
        assert_eq!(entry.last_seen, Some(2));
    }

    #[test]
    fn test_metrics_for_unregistered_participant() {
        let registry = DeviceRegistry::new();
        assert_eq!(
            registry.update_metrics(ParticipantId::Intel, sample(50.0), 1),
            Err(RegistryError::UnknownParticipant(ParticipantId::Intel))
        );
        assert!(registry.is_empty());
        assert!(registry.touch(ParticipantId::Intel, 1).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_reports_each_transition_once() {
        let registry = DeviceRegistry::new();
        let threshold = Duration::from_secs(10);
        registry.register(ParticipantId::Snapdragon, 1, host(), 0);
        registry.register(ParticipantId::Intel, 1, host(), 5_000);

        assert!(registry.sweep_stale(10_000, threshold).is_empty());
        assert_eq!(
            registry.sweep_stale(10_001, threshold),
            vec![ParticipantId::Snapdragon]
        );
        // Second cycle is silent for the already-demoted entry
        assert!(registry.sweep_stale(10_002, threshold).is_empty());
        assert_eq!(
            registry.sweep_stale(20_000, threshold),
            vec![ParticipantId::Intel]
        );
        assert_eq!(registry.connected_count(), 0);
    }

    #[test]
    fn test_metrics_revive_disconnected_entry() {
        let registry = DeviceRegistry::new();
        registry.register(ParticipantId::Snapdragon, 1, host(), 0);
        assert!(registry.mark_disconnected(ParticipantId::Snapdragon, 1));
        assert!(!registry.mark_disconnected(ParticipantId::Snapdragon, 1));

        assert_eq!(
            registry.update_metrics(ParticipantId::Snapdragon, sample(40.0), 1),
            Ok(true)
        );
        assert_eq!(
            registry.update_metrics(ParticipantId::Snapdragon, sample(41.0), 2),
            Ok(false)
        );
    }

    #[test]
    fn test_superseded_session_cannot_disconnect() {
        let registry = DeviceRegistry::new();
        registry.register(ParticipantId::Intel, 1, host(), 0);
        registry.register(ParticipantId::Intel, 2, host(), 10);

        // The first transport closing late must not demote the second
        assert!(!registry.mark_disconnected(ParticipantId::Intel, 1));
        let entry = registry.get(ParticipantId::Intel).unwrap();
        assert!(entry.connected);
        assert_eq!(entry.session, Some(2));

        assert!(registry.mark_disconnected(ParticipantId::Intel, 2));
        assert!(!registry.get(ParticipantId::Intel).unwrap().connected);
    }

    #[test]
    fn test_snapshot_canonical_order() {
        let registry = DeviceRegistry::new();
        registry.register(ParticipantId::Intel, 1, host(), 0);
        registry.register(ParticipantId::Snapdragon, 1, host(), 0);
        let ids: Vec<_> = registry.snapshot().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ParticipantId::ALL.to_vec());
    }
}
