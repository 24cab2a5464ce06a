//! Commentary rule configuration

use pc_protocol::{ParticipantId, Primitive};
use serde::{Deserialize, Serialize};

/// Threshold test applied to one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Above(f64),
    Below(f64),
    Equals(f64),
}

impl Condition {
    /// Whether a reading satisfies the condition; non-numeric readings never do
    pub fn matches(&self, value: &Primitive) -> bool {
        let Some(v) = value.as_f64() else {
            return false;
        };
        match *self {
            Condition::Above(t) => v > t,
            Condition::Below(t) => v < t,
            Condition::Equals(t) => v == t,
        }
    }
}

/// One commentary line triggered by a metric threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryRule {
    pub participant: ParticipantId,
    /// Metric key to inspect
    pub metric: String,
    pub condition: Condition,
    /// Line to emit; `{value}` is replaced by the reading
    pub template: String,
}

impl CommentaryRule {
    pub fn new(
        participant: ParticipantId,
        metric: &str,
        condition: Condition,
        template: &str,
    ) -> Self {
        Self {
            participant,
            metric: metric.to_string(),
            condition,
            template: template.to_string(),
        }
    }

    /// Render the line for a reading
    pub fn render(&self, value: &Primitive) -> String {
        self.template.replace("{value}", &value.to_string())
    }
}

/// Built-in rule table
pub fn default_commentary_rules() -> Vec<CommentaryRule> {
    use Condition::*;
    use ParticipantId::*;

    vec![
        CommentaryRule::new(
            Intel,
            "temperature",
            Above(75.0),
            "Intel reaching {value}°C - Thermal throttling imminent",
        ),
        CommentaryRule::new(
            Snapdragon,
            "temperature",
            Below(50.0),
            "Snapdragon cruising at a cool {value}°C",
        ),
        CommentaryRule::new(
            Intel,
            "battery_percent",
            Below(70.0),
            "Intel battery already at {value}% - Range anxiety activated",
        ),
        CommentaryRule::new(
            Snapdragon,
            "battery_percent",
            Above(90.0),
            "Snapdragon still at {value}% - All-day confidence",
        ),
        CommentaryRule::new(
            Intel,
            "fan_rpm",
            Above(3000.0),
            "Intel fan at {value} RPM - Preparing for takeoff",
        ),
        CommentaryRule::new(
            Snapdragon,
            "fan_rpm",
            Equals(0.0),
            "Snapdragon fan status: What fan?",
        ),
    ]
}
