//! Participant identifier type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Identity of a measurement agent.
///
/// The set is closed: the championship only ever pits these device classes
/// against each other. Declaration order is the canonical order, which is
/// also the tie-break order when two results compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantId {
    /// Snapdragon X Elite laptop
    Snapdragon,
    /// Intel Core Ultra laptop
    Intel,
}

impl ParticipantId {
    /// Every participant, in canonical order
    pub const ALL: [ParticipantId; 2] = [ParticipantId::Snapdragon, ParticipantId::Intel];

    /// Wire/config name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantId::Snapdragon => "snapdragon",
            ParticipantId::Intel => "intel",
        }
    }

    /// Human-facing name used in commentary and verdicts
    pub fn display_name(&self) -> &'static str {
        match self {
            ParticipantId::Snapdragon => "Snapdragon",
            ParticipantId::Intel => "Intel",
        }
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapdragon" => Ok(ParticipantId::Snapdragon),
            "intel" => Ok(ParticipantId::Intel),
            other => Err(ProtocolError::UnknownParticipant(other.to_string())),
        }
    }
}
