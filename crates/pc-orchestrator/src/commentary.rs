//! Commentary generation and history

use std::collections::VecDeque;

use pc_core::config::CommentaryRule;
use pc_core::ipc::CommentaryEntry;
use pc_protocol::{Metrics, ParticipantId};

/// Lines kept in the history
pub const COMMENTARY_CAPACITY: usize = 20;

/// Lines triggered by one metrics sample, in rule order
pub fn generate(id: ParticipantId, metrics: &Metrics, rules: &[CommentaryRule]) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.participant == id)
        .filter_map(|rule| {
            let value = metrics.get(&rule.metric)?;
            rule.condition.matches(value).then(|| rule.render(value))
        })
        .collect()
}

/// Bounded FIFO of commentary entries
#[derive(Debug, Clone)]
pub struct CommentaryRing {
    entries: VecDeque<CommentaryEntry>,
    capacity: usize,
}

impl CommentaryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest entry when full
    pub fn push(&mut self, entry: CommentaryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<CommentaryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommentaryRing {
    fn default() -> Self {
        Self::new(COMMENTARY_CAPACITY)
    }
}
