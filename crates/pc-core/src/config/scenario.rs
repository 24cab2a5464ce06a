//! Scenario catalogue configuration

use pc_protocol::{Measurement, Params, ScenarioConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether the smaller or the larger measurement wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Minimize,
    Maximize,
}

/// How results of a scenario are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRule {
    pub measurement: Measurement,
    #[serde(default)]
    pub objective: Objective,
}

impl ComparisonRule {
    pub fn minimize(measurement: Measurement) -> Self {
        Self {
            measurement,
            objective: Objective::Minimize,
        }
    }
}

/// A configured scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// One-line description for listings
    #[serde(default)]
    pub description: String,
    /// Wall-clock budget in seconds
    pub duration_secs: u64,
    /// Number of progress steps
    pub steps: u32,
    /// Winner comparison rule
    pub rule: ComparisonRule,
    /// Extra parameters forwarded to agents
    #[serde(default)]
    pub params: Params,
    /// Flavor lines appended to the winner announcement
    #[serde(default)]
    pub victory_messages: Vec<String>,
}

impl ScenarioDefinition {
    /// Build the immutable config sent to agents
    pub fn to_config(&self, name: &str) -> ScenarioConfig {
        ScenarioConfig {
            name: name.to_string(),
            duration_secs: self.duration_secs,
            step_count: self.steps,
            params: self.params.clone(),
        }
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The scenarios shipped with the championship
pub fn default_scenarios() -> BTreeMap<String, ScenarioDefinition> {
    let mut scenarios = BTreeMap::new();

    scenarios.insert(
        "ai_showdown".to_string(),
        ScenarioDefinition {
            description: "Generate one image on-device; fastest completion wins".to_string(),
            duration_secs: 30,
            steps: 20,
            rule: ComparisonRule::minimize(Measurement::ElapsedTime),
            params: Params::new(),
            victory_messages: lines(&[
                "Snapdragon completes another masterpiece while Intel contemplates the canvas",
                "45 TOPS vs 11 TOPS - The math speaks for itself",
                "Snapdragon: 'Should I generate another one while we wait?'",
                "AI acceleration: Where NPUs matter more than promises",
            ]),
        },
    );

    scenarios.insert(
        "battery_race".to_string(),
        ScenarioDefinition {
            description: "Sustained load; least battery drained wins".to_string(),
            duration_secs: 180,
            steps: 180,
            rule: ComparisonRule::minimize(Measurement::BatteryDrain),
            params: Params::new(),
            victory_messages: lines(&[
                "Snapdragon sips power like fine wine, Intel gulps like it's happy hour",
                "All-day battery vs all-day anxiety",
                "Efficiency: Not just a buzzword for Snapdragon",
                "Power management: Silent victory",
            ]),
        },
    );

    scenarios.insert(
        "thermal_test".to_string(),
        ScenarioDefinition {
            description: "Thermal stress; coolest peak temperature wins".to_string(),
            duration_secs: 180,
            steps: 180,
            rule: ComparisonRule::minimize(Measurement::PeakTemperature),
            params: Params::new(),
            victory_messages: lines(&[
                "Snapdragon maintains zen-like calm while Intel reaches for ice packs",
                "The sound of silence vs the roar of desperation",
                "Laptop on lap: Comfortable vs Concerning",
                "4nm efficiency vs 10nm... enthusiasm",
            ]),
        },
    );

    scenarios
}

/// Flavor lines broadcast when a scenario starts
pub fn default_loading_messages() -> Vec<String> {
    lines(&[
        "Initializing quantum advantage...",
        "Calibrating superiority metrics...",
        "Detecting nearby jet engines... oh wait, that's just Intel's fan",
        "Loading AI capabilities... 45 TOPS located",
        "Engaging silent mode (Snapdragon exclusive feature)...",
        "Preparing thermal warnings for Intel...",
        "Optimizing battery anxiety algorithms...",
        "Summoning the power of 4nm architecture...",
    ])
}
