//! Device profile configuration

use pc_protocol::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Profile for a participating device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Marketing name shown in the welcome message
    pub name: String,

    /// Free-form spec sheet (processor, NPU, ...)
    #[serde(default)]
    pub specs: BTreeMap<String, String>,

    /// Parameters for the simulated sensors and workloads
    #[serde(default)]
    pub simulation: SimulationProfile,
}

impl DeviceProfile {
    /// Built-in profile for a participant
    pub fn default_for(id: ParticipantId) -> Self {
        match id {
            ParticipantId::Snapdragon => Self {
                name: "Samsung Galaxy Book4 Edge".to_string(),
                specs: specs(&[
                    ("processor", "Snapdragon X Elite"),
                    ("npu", "Hexagon NPU, 45 TOPS"),
                    ("process", "4nm"),
                ]),
                simulation: SimulationProfile::snapdragon(),
            },
            ParticipantId::Intel => Self {
                name: "Lenovo Yoga 7i".to_string(),
                specs: specs(&[
                    ("processor", "Intel Core Ultra 7"),
                    ("npu", "Intel AI Boost, 11 TOPS"),
                    ("process", "Intel 4"),
                ]),
                simulation: SimulationProfile::intel(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()
    }
}

fn specs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Inclusive range sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds must be finite
    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.min.is_finite() && self.max.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "{}: bounds must be finite, got {}..{}",
                field, self.min, self.max
            )))
        }
    }
}

/// Fan behaviour as a function of temperature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FanCurve {
    /// Silent until `onset_c`, then linear
    Passive { onset_c: f64, rpm_per_degree: f64 },
    /// Stepped laptop fan: 0 below 40°C, 1500/2500/3500 in 10°C bands, then linear up to `max_rpm`
    Stepped { max_rpm: u32 },
}

impl FanCurve {
    /// Fan speed at a given temperature
    pub fn rpm(&self, temp_c: f64) -> u32 {
        match *self {
            FanCurve::Passive {
                onset_c,
                rpm_per_degree,
            } => {
                if temp_c < onset_c {
                    0
                } else {
                    ((temp_c - onset_c) * rpm_per_degree) as u32
                }
            }
            FanCurve::Stepped { max_rpm } => {
                if temp_c < 40.0 {
                    0
                } else if temp_c < 50.0 {
                    1500
                } else if temp_c < 60.0 {
                    2500
                } else if temp_c < 70.0 {
                    3500
                } else {
                    max_rpm.min((1000.0 + (temp_c - 40.0) * 100.0) as u32)
                }
            }
        }
    }
}

/// Simulated sensor and workload parameters for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationProfile {
    /// Idle temperature in °C
    pub base_temp: f64,
    /// °C added per percent of CPU load
    pub load_factor: f64,
    /// Random noise added to each temperature reading
    pub temp_noise: Range,
    /// °C added while a scenario is executing
    pub test_heat: f64,
    /// Fan model
    pub fan: FanCurve,
    /// Total seconds for one image generation in `ai_showdown`
    pub ai_seconds: Range,
    /// Battery percentage points consumed by `battery_race`
    pub battery_drain: Range,
    /// Simulated battery level when the host has none
    pub battery_percent: f64,
}

impl SimulationProfile {
    pub fn snapdragon() -> Self {
        Self {
            base_temp: 35.0,
            load_factor: 0.15,
            temp_noise: Range::new(-2.0, 2.0),
            test_heat: 10.0,
            fan: FanCurve::Passive {
                onset_c: 60.0,
                rpm_per_degree: 50.0,
            },
            ai_seconds: Range::new(8.0, 12.0),
            battery_drain: Range::new(2.0, 3.0),
            battery_percent: 95.0,
        }
    }

    pub fn intel() -> Self {
        Self {
            base_temp: 45.0,
            load_factor: 0.4,
            temp_noise: Range::new(-3.0, 5.0),
            test_heat: 25.0,
            fan: FanCurve::Stepped { max_rpm: 4500 },
            ai_seconds: Range::new(25.0, 35.0),
            battery_drain: Range::new(5.0, 7.0),
            battery_percent: 80.0,
        }
    }
}

impl SimulationProfile {
    /// Reject ranges the sensor and workload simulation cannot sample
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.temp_noise.validate("temp_noise")?;
        self.ai_seconds.validate("ai_seconds")?;
        self.battery_drain.validate("battery_drain")?;
        if self.ai_seconds.min < 0.0 {
            return Err(ConfigError::Invalid(
                "ai_seconds: duration cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self::snapdragon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passive_fan_is_silent_when_cool() {
        let fan = SimulationProfile::snapdragon().fan;
        assert_eq!(fan.rpm(45.0), 0);
        assert_eq!(fan.rpm(70.0), 500);
    }

    #[test]
    fn test_stepped_fan_bands() {
        let fan = SimulationProfile::intel().fan;
        assert_eq!(fan.rpm(35.0), 0);
        assert_eq!(fan.rpm(45.0), 1500);
        assert_eq!(fan.rpm(55.0), 2500);
        assert_eq!(fan.rpm(65.0), 3500);
        assert_eq!(fan.rpm(75.0), 4500);
        assert_eq!(fan.rpm(100.0), 4500);
    }

    #[test]
    fn test_builtin_profiles_are_valid() {
        for id in ParticipantId::ALL {
            assert!(DeviceProfile::default_for(id).validate().is_ok());
        }
    }

    #[test]
    fn test_infinite_ai_seconds_rejected() {
        let profile: SimulationProfile = toml::from_str(
            r#"
            ai_seconds = { min = inf, max = inf }
            "#,
        )
        .unwrap();
        assert!(profile.validate().is_err());

        let mut profile = SimulationProfile::intel();
        profile.ai_seconds = Range::new(-1.0, 2.0);
        assert!(profile.validate().is_err());
        profile.temp_noise = Range::new(f64::NAN, 1.0);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_default_profiles_differ() {
        let snap = DeviceProfile::default_for(ParticipantId::Snapdragon);
        let intel = DeviceProfile::default_for(ParticipantId::Intel);
        assert!(snap.simulation.ai_seconds.max < intel.simulation.ai_seconds.min);
        assert_eq!(snap.specs["processor"], "Snapdragon X Elite");
    }
}
