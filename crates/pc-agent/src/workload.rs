//! Simulated scenario workloads
//!
//! Each scenario is paced and scored from the device's simulation profile:
//! `ai_showdown` takes a device-specific total time, `battery_race` drains
//! a device-specific amount and `thermal_test` tracks the peak simulated
//! temperature under load. Unknown scenarios just run out their budget.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use pc_core::config::SimulationProfile;
use pc_core::traits::{StepContext, Workload, WorkloadFactory};
use pc_protocol::{ResultPayload, ScenarioConfig};

use crate::metrics::{round1, sample_range, simulated_temperature};

/// CPU load assumed by the thermal test unless `load_percent` is given
const FULL_LOAD_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    AiShowdown { total: Duration },
    BatteryRace { drain: f64 },
    ThermalTest { load_percent: f64 },
    Timed,
}

/// Workload driven by a device simulation profile
pub struct SimulatedWorkload {
    profile: SimulationProfile,
    kind: Kind,
    peak_temperature: f64,
    rng: StdRng,
}

impl SimulatedWorkload {
    pub fn new(config: &ScenarioConfig, profile: SimulationProfile) -> Self {
        Self::with_rng(config, profile, StdRng::from_entropy())
    }

    pub fn with_rng(config: &ScenarioConfig, profile: SimulationProfile, mut rng: StdRng) -> Self {
        let kind = match config.name.as_str() {
            "ai_showdown" => Kind::AiShowdown {
                total: generation_time(sample_range(profile.ai_seconds, &mut rng)),
            },
            "battery_race" => Kind::BatteryRace {
                drain: round1(sample_range(profile.battery_drain, &mut rng)),
            },
            "thermal_test" => Kind::ThermalTest {
                load_percent: config
                    .params
                    .get("load_percent")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(FULL_LOAD_PERCENT),
            },
            other => {
                tracing::debug!("No simulation for {}; running it as a timed workload", other);
                Kind::Timed
            }
        };

        Self {
            profile,
            kind,
            peak_temperature: 0.0,
            rng,
        }
    }
}

impl Workload for SimulatedWorkload {
    fn step_interval(&self, config: &ScenarioConfig) -> Duration {
        match self.kind {
            Kind::AiShowdown { total } => total / config.total_steps(),
            _ => Duration::from_secs(config.duration_secs) / config.total_steps(),
        }
    }

    fn step(&mut self, _config: &ScenarioConfig, ctx: StepContext) -> Option<ResultPayload> {
        if let Kind::ThermalTest { load_percent } = self.kind {
            let temp = simulated_temperature(&self.profile, load_percent, true, &mut self.rng);
            self.peak_temperature = self.peak_temperature.max(temp);
        }

        if !ctx.is_final() {
            return None;
        }

        let mut result = ResultPayload::elapsed(round1(ctx.elapsed.as_secs_f64()));
        match self.kind {
            Kind::BatteryRace { drain } => result.battery_drain = Some(drain),
            Kind::ThermalTest { .. } => result.max_temperature = Some(self.peak_temperature),
            Kind::AiShowdown { .. } | Kind::Timed => {}
        }
        Some(result)
    }
}

/// Seconds to a generation time, zero when the profile gave nonsense
fn generation_time(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|_| {
        tracing::warn!("Unusable ai_seconds sample {}, finishing immediately", secs);
        Duration::ZERO
    })
}

/// Builds a `SimulatedWorkload` per run
pub struct SimulatedWorkloadFactory {
    profile: SimulationProfile,
}

impl SimulatedWorkloadFactory {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }
}

impl WorkloadFactory for SimulatedWorkloadFactory {
    fn create(&self, config: &ScenarioConfig) -> Box<dyn Workload> {
        Box::new(SimulatedWorkload::new(config, self.profile.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_core::config::{default_scenarios, Range};

    fn config(name: &str) -> ScenarioConfig {
        default_scenarios()[name].to_config(name)
    }

    fn seeded(name: &str, profile: SimulationProfile) -> SimulatedWorkload {
        SimulatedWorkload::with_rng(&config(name), profile, StdRng::seed_from_u64(42))
    }

    fn run_to_end(workload: &mut SimulatedWorkload, config: &ScenarioConfig) -> ResultPayload {
        let total = config.total_steps();
        let interval = workload.step_interval(config);
        for step in 1..total {
            let ctx = StepContext {
                step,
                total,
                elapsed: interval * step,
            };
            assert!(workload.step(config, ctx).is_none());
        }
        workload
            .step(
                config,
                StepContext {
                    step: total,
                    total,
                    elapsed: interval * total,
                },
            )
            .expect("final step yields a result")
    }

    #[test]
    fn test_ai_showdown_pacing_per_device() {
        let cfg = config("ai_showdown");
        let snap = seeded("ai_showdown", SimulationProfile::snapdragon());
        let intel = seeded("ai_showdown", SimulationProfile::intel());

        let snap_total = snap.step_interval(&cfg) * cfg.total_steps();
        let intel_total = intel.step_interval(&cfg) * cfg.total_steps();

        assert!(snap_total >= Duration::from_millis(7_990) && snap_total <= Duration::from_secs(12));
        assert!(intel_total >= Duration::from_millis(24_990) && intel_total <= Duration::from_secs(35));
    }

    #[test]
    fn test_ai_showdown_reports_elapsed() {
        let cfg = config("ai_showdown");
        let mut workload = seeded("ai_showdown", SimulationProfile::snapdragon());
        let result = run_to_end(&mut workload, &cfg);
        assert!(result.success);
        assert!(result.elapsed_secs >= 7.9 && result.elapsed_secs <= 12.1);
        assert_eq!(result.battery_drain, None);
    }

    #[test]
    fn test_battery_race_drain_in_profile_range() {
        let cfg = config("battery_race");
        let mut workload = seeded("battery_race", SimulationProfile::intel());
        let drain = run_to_end(&mut workload, &cfg).battery_drain.unwrap();
        assert!((5.0..=7.0).contains(&drain));
        assert_eq!(workload.step_interval(&cfg), Duration::from_secs(1));
    }

    #[test]
    fn test_thermal_test_peaks() {
        let cfg = config("thermal_test");
        let snap = run_to_end(&mut seeded("thermal_test", SimulationProfile::snapdragon()), &cfg)
            .max_temperature
            .unwrap();
        let intel = run_to_end(&mut seeded("thermal_test", SimulationProfile::intel()), &cfg)
            .max_temperature
            .unwrap();
        assert_eq!(intel, 100.0);
        assert!(snap < 70.0);
    }

    #[test]
    fn test_unbounded_generation_time_does_not_panic() {
        let mut profile = SimulationProfile::snapdragon();
        profile.ai_seconds = Range::new(f64::INFINITY, f64::INFINITY);
        let cfg = config("ai_showdown");
        let workload = seeded("ai_showdown", profile);
        assert_eq!(workload.step_interval(&cfg), Duration::ZERO);

        assert_eq!(generation_time(f64::NAN), Duration::ZERO);
        assert_eq!(generation_time(-3.0), Duration::ZERO);
        assert_eq!(generation_time(2.5), Duration::from_millis(2500));
    }

    #[test]
    fn test_unknown_scenario_is_timed() {
        let cfg = ScenarioConfig {
            name: "boot_race".into(),
            duration_secs: 4,
            step_count: 2,
            params: Default::default(),
        };
        let mut workload =
            SimulatedWorkload::with_rng(&cfg, SimulationProfile::intel(), StdRng::seed_from_u64(1));
        assert_eq!(workload.step_interval(&cfg), Duration::from_secs(2));
        let result = run_to_end(&mut workload, &cfg);
        assert_eq!(result.elapsed_secs, 4.0);
        assert_eq!(result.max_temperature, None);
    }
}
