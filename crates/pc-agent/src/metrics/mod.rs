//! System metrics collection
//!
//! CPU and memory come from the host via `sysinfo`. Laptop sensors
//! (temperature, fan, battery) are simulated from the device profile so the
//! demo behaves the same on any machine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sysinfo::System;

use pc_core::config::{Range, SimulationProfile};
use pc_core::traits::MetricsSource;
use pc_protocol::Metrics;

/// Simulated temperatures never leave this band
const TEMP_FLOOR_C: f64 = 30.0;
const TEMP_CEILING_C: f64 = 100.0;

/// Battery percentage points consumed per sample while executing
const BATTERY_STEP_PER_SAMPLE: f64 = 0.1;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Uniform sample from an inclusive range; a degenerate or unbounded range
/// yields `min`
pub fn sample_range<R: Rng + ?Sized>(range: Range, rng: &mut R) -> f64 {
    if range.min.is_finite() && range.max.is_finite() && range.max > range.min {
        rng.gen_range(range.min..=range.max)
    } else {
        range.min
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Temperature for a CPU load, hotter while a scenario runs
pub fn simulated_temperature<R: Rng + ?Sized>(
    profile: &SimulationProfile,
    cpu_percent: f64,
    executing: bool,
    rng: &mut R,
) -> f64 {
    let mut temp =
        profile.base_temp + cpu_percent * profile.load_factor + sample_range(profile.temp_noise, rng);
    if executing {
        temp += profile.test_heat;
    }
    round1(temp.clamp(TEMP_FLOOR_C, TEMP_CEILING_C))
}

/// One reading of the simulated sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub fan_rpm: u32,
    pub battery_percent: f64,
}

/// Simulated laptop sensors
pub struct SensorSimulator {
    profile: SimulationProfile,
    battery_percent: f64,
    rng: StdRng,
}

impl SensorSimulator {
    pub fn new(profile: SimulationProfile) -> Self {
        Self::with_rng(profile, StdRng::from_entropy())
    }

    pub fn with_rng(profile: SimulationProfile, rng: StdRng) -> Self {
        Self {
            battery_percent: profile.battery_percent,
            profile,
            rng,
        }
    }

    pub fn read(&mut self, cpu_percent: f64, executing: bool) -> SensorReading {
        let temperature =
            simulated_temperature(&self.profile, cpu_percent, executing, &mut self.rng);
        if executing {
            self.battery_percent = (self.battery_percent - BATTERY_STEP_PER_SAMPLE).max(0.0);
        }

        SensorReading {
            temperature,
            fan_rpm: self.profile.fan.rpm(temperature),
            battery_percent: round1(self.battery_percent),
        }
    }
}

/// Metrics source combining host counters with simulated sensors
pub struct SystemMetrics {
    system: System,
    sensors: SensorSimulator,
}

impl SystemMetrics {
    pub fn new(profile: SimulationProfile) -> Self {
        let mut system = System::new();
        // CPU usage is a delta; prime the first measurement
        system.refresh_cpu_usage();
        Self {
            system,
            sensors: SensorSimulator::new(profile),
        }
    }
}

impl MetricsSource for SystemMetrics {
    fn sample(&mut self, workload: Option<&str>) -> Metrics {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu_percent = round1(self.system.global_cpu_usage() as f64);
        let total_memory = self.system.total_memory() as f64;
        let used_memory = self.system.used_memory() as f64;
        let memory_percent = if total_memory > 0.0 {
            round1(used_memory / total_memory * 100.0)
        } else {
            0.0
        };

        let reading = self.sensors.read(cpu_percent, workload.is_some());

        let mut metrics = Metrics::new();
        metrics.insert("cpu_percent".into(), cpu_percent.into());
        metrics.insert("cpu_cores".into(), (self.system.cpus().len() as i64).into());
        metrics.insert("memory_percent".into(), memory_percent.into());
        metrics.insert(
            "memory_used_gb".into(),
            round1(used_memory / BYTES_PER_GB).into(),
        );
        metrics.insert("temperature".into(), reading.temperature.into());
        metrics.insert("fan_rpm".into(), reading.fan_rpm.into());
        metrics.insert("battery_percent".into(), reading.battery_percent.into());
        metrics.insert("battery_charging".into(), false.into());
        metrics.insert("workload".into(), workload.unwrap_or("idle").into());
        metrics
    }
}
