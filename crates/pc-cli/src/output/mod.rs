//! Output formatting utilities for the CLI
//!
//! This module provides functions for formatting orchestrator data as
//! human-readable terminal output: tables for participants and scenarios,
//! status and verdict displays, event lines for `watch`, and colored status
//! messages.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use pc_core::config::Objective;
use pc_core::time::{current_time_millis, millis_to_secs};
use pc_protocol::Measurement;

use crate::ipc::{CommentaryEntry, DeviceInfo, IpcEvent, OrchestratorStatus, ScenarioInfo, Verdict};

/// Format the participant list as an ASCII table
///
/// # Arguments
/// * `devices` - Participants as reported by the orchestrator
/// * `detailed` - If true, includes host and temperature columns
///
/// # Returns
/// A formatted string suitable for terminal output, or "No participants
/// configured" if the list is empty.
pub fn format_devices(devices: &[DeviceInfo], detailed: bool) -> String {
    if devices.is_empty() {
        return "No participants configured".to_string();
    }

    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "CPU")]
        cpu: String,
        #[tabled(rename = "BATTERY")]
        battery: String,
        #[tabled(rename = "LAST SEEN")]
        last_seen: String,
    }

    #[derive(Tabled)]
    struct DeviceRowDetailed {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "HOSTNAME")]
        hostname: String,
        #[tabled(rename = "OS/ARCH")]
        os_arch: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "CPU")]
        cpu: String,
        #[tabled(rename = "TEMP")]
        temperature: String,
        #[tabled(rename = "BATTERY")]
        battery: String,
        #[tabled(rename = "LAST SEEN")]
        last_seen: String,
    }

    let now = current_time_millis();

    if detailed {
        let rows: Vec<DeviceRowDetailed> = devices
            .iter()
            .map(|d| DeviceRowDetailed {
                id: d.id.to_string(),
                name: d.name.clone(),
                hostname: d
                    .host
                    .as_ref()
                    .map(|h| truncate(&h.hostname, 24))
                    .unwrap_or_else(|| "-".to_string()),
                os_arch: d
                    .host
                    .as_ref()
                    .map(|h| format!("{}/{}", h.os, h.arch))
                    .unwrap_or_else(|| "-".to_string()),
                status: d.status.to_string(),
                cpu: metric(d, "cpu_percent", "%"),
                temperature: metric(d, "temperature", "°C"),
                battery: metric(d, "battery_percent", "%"),
                last_seen: last_seen(d.last_seen, now),
            })
            .collect();

        Table::new(rows)
            .with(Style::rounded())
            .with(Width::wrap(120))
            .to_string()
    } else {
        let rows: Vec<DeviceRow> = devices
            .iter()
            .map(|d| DeviceRow {
                id: d.id.to_string(),
                name: d.name.clone(),
                status: d.status.to_string(),
                cpu: metric(d, "cpu_percent", "%"),
                battery: metric(d, "battery_percent", "%"),
                last_seen: last_seen(d.last_seen, now),
            })
            .collect();

        Table::new(rows).with(Style::rounded()).to_string()
    }
}

/// Format the scenario catalogue as an ASCII table
pub fn format_scenarios(scenarios: &[ScenarioInfo]) -> String {
    if scenarios.is_empty() {
        return "No scenarios configured".to_string();
    }

    #[derive(Tabled)]
    struct ScenarioRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "DURATION")]
        duration: String,
        #[tabled(rename = "STEPS")]
        steps: u32,
        #[tabled(rename = "JUDGED ON")]
        judged_on: String,
        #[tabled(rename = "DESCRIPTION")]
        description: String,
    }

    let rows: Vec<ScenarioRow> = scenarios
        .iter()
        .map(|s| ScenarioRow {
            name: s.name.clone(),
            duration: format_duration(s.duration_secs),
            steps: s.steps,
            judged_on: format!(
                "{} {}",
                objective_label(s.objective),
                measurement_label(s.measurement)
            ),
            description: s.description.clone(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Format orchestrator status as a human-readable string
///
/// Shows uptime and connection counts, then the scenario state machine with
/// any results collected for the current run.
pub fn format_status(status: &OrchestratorStatus) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Orchestrator Status: {}\n",
        if status.running { "Running" } else { "Stopped" }
    ));
    output.push_str(&format!("Version: {}\n", status.version));
    output.push_str(&format!(
        "Uptime: {}\n",
        format_duration(status.uptime_secs)
    ));
    output.push_str(&format!("Agent Listener: {}\n", status.bind_address));
    output.push_str(&format!("Connected Participants: {}\n", status.connected_count));

    let demo = &status.demo;
    output.push_str(&format!("Demo Phase: {}\n", demo.phase));
    if let Some(scenario) = &demo.current_scenario {
        output.push_str(&format!(
            "Scenario: {} (run {})\n",
            scenario,
            demo.run_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
        ));
    }
    if let Some(started_at) = demo.started_at {
        let elapsed = current_time_millis().saturating_sub(started_at);
        output.push_str(&format!("Running For: {:.1}s\n", millis_to_secs(elapsed)));
    }
    for entry in &demo.results {
        let outcome = if entry.result.success { "done" } else { "failed" };
        output.push_str(&format!(
            "  {}: {} in {:.1}s\n",
            entry.device.display_name(),
            outcome,
            entry.result.elapsed_secs
        ));
    }

    output
}

/// Format commentary entries, oldest first
pub fn format_commentary(entries: &[CommentaryEntry]) -> String {
    if entries.is_empty() {
        return "No commentary yet".to_string();
    }

    entries
        .iter()
        .map(|e| format!("[{}] {}", e.kind, e.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a verdict with its standings
pub fn format_verdict(verdict: &Verdict) -> String {
    let mut output = format!("{}\n", verdict.message);

    for standing in &verdict.standings {
        let value = match (standing.lost, standing.value) {
            (false, Some(v)) => format!("{:.1}", v),
            _ => "lost".to_string(),
        };
        let marker = if verdict.winner == Some(standing.device) {
            " *"
        } else {
            ""
        };
        output.push_str(&format!(
            "  {}: {}{}\n",
            standing.device.display_name(),
            value,
            marker
        ));
    }

    output
}

/// One line describing an event, for `watch`
///
/// Metrics broadcasts arrive every couple of seconds per participant, so
/// they are only rendered when `include_metrics` is set.
pub fn format_event(event: &IpcEvent, include_metrics: bool) -> Option<String> {
    match event {
        IpcEvent::MetricsBroadcast {
            device, metrics, ..
        } => {
            if !include_metrics {
                return None;
            }
            let mut keys: Vec<_> = metrics.iter().collect();
            keys.sort_by(|a, b| a.0.cmp(b.0));
            let values = keys
                .into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            Some(format!("[metrics] {}: {}", device.display_name(), values))
        }
        IpcEvent::DeviceStatus { device, status, .. } => {
            Some(format!("[device] {} {}", device.display_name(), status))
        }
        IpcEvent::CommentaryUpdate(entry) => Some(format!("[commentary] {}", entry.text)),
        IpcEvent::ScenarioStarted {
            scenario,
            run_id,
            loading_message,
            ..
        } => Some(format!(
            "[start] {} (run {}): {}",
            scenario, run_id, loading_message
        )),
        IpcEvent::ScenarioProgress {
            device,
            step,
            total_steps,
            ..
        } => Some(format!(
            "[progress] {} {}/{}",
            device.display_name(),
            step,
            total_steps
        )),
        IpcEvent::ScenarioStopped { scenario, .. } => Some(format!(
            "[stop] {} abandoned",
            scenario.as_deref().unwrap_or("scenario")
        )),
        IpcEvent::WinnerDeclared(verdict) => {
            Some(format!("[winner] {}", verdict.message))
        }
    }
}

fn metric(device: &DeviceInfo, key: &str, unit: &str) -> String {
    device
        .metrics
        .as_ref()
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_f64())
        .map(|v| format!("{:.0}{}", v, unit))
        .unwrap_or_else(|| "-".to_string())
}

fn last_seen(last_seen: Option<u64>, now: u64) -> String {
    match last_seen {
        Some(at) => format!("{} ago", format_duration(now.saturating_sub(at) / 1000)),
        None => "never".to_string(),
    }
}

fn measurement_label(measurement: Measurement) -> &'static str {
    match measurement {
        Measurement::ElapsedTime => "time",
        Measurement::BatteryDrain => "battery drain",
        Measurement::PeakTemperature => "peak temperature",
    }
}

fn objective_label(objective: Objective) -> &'static str {
    match objective {
        Objective::Minimize => "lowest",
        Objective::Maximize => "highest",
    }
}

/// Format duration in human-readable form
fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}m {}s", mins, remaining_secs)
    } else if secs < 86400 {
        let hours = secs / 3600;
        let remaining_mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, remaining_mins)
    } else {
        let days = secs / 86400;
        let remaining_hours = (secs % 86400) / 3600;
        format!("{}d {}h", days, remaining_hours)
    }
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success message in green with a checkmark prefix
///
/// Outputs to stdout with green coloring for positive feedback to the user.
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr with red coloring for error feedback to the user.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan to stdout
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_core::ipc::Standing;
    use pc_core::types::ConnectionStatus;
    use pc_protocol::ParticipantId;

    fn verdict(winner: Option<ParticipantId>) -> Verdict {
        Verdict {
            scenario: "ai_showdown".into(),
            run_id: 4,
            winner,
            ratio: Some(3.75),
            message: "Snapdragon wins by 3.8x!".into(),
            standings: vec![
                Standing {
                    device: ParticipantId::Snapdragon,
                    value: Some(8.0),
                    lost: false,
                },
                Standing {
                    device: ParticipantId::Intel,
                    value: None,
                    lost: true,
                },
            ],
            timestamp: 0,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
        assert_eq!(format_duration(90000), "1d 1h");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("snapdragon-x-elite", 10), "snapdra...");
        assert_eq!(truncate("°°°°°°", 5), "°°...");
    }

    #[test]
    fn test_verdict_marks_winner_and_losses() {
        let text = format_verdict(&verdict(Some(ParticipantId::Snapdragon)));
        assert!(text.starts_with("Snapdragon wins by 3.8x!"));
        assert!(text.contains("Snapdragon: 8.0 *"));
        assert!(text.contains("Intel: lost"));
    }

    #[test]
    fn test_metrics_events_hidden_by_default() {
        let mut metrics = serde_json::Map::new();
        metrics.insert("cpu_percent".into(), serde_json::json!(41.5));
        let event = IpcEvent::MetricsBroadcast {
            device: ParticipantId::Intel,
            metrics,
            timestamp: 1,
        };

        assert!(format_event(&event, false).is_none());
        assert_eq!(
            format_event(&event, true).unwrap(),
            "[metrics] Intel: cpu_percent=41.5"
        );
    }

    #[test]
    fn test_device_event_line() {
        let event = IpcEvent::DeviceStatus {
            device: ParticipantId::Snapdragon,
            status: ConnectionStatus::Disconnected,
            timestamp: 1,
        };
        assert_eq!(
            format_event(&event, false).unwrap(),
            "[device] Snapdragon disconnected"
        );
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(format_devices(&[], false), "No participants configured");
        assert_eq!(format_scenarios(&[]), "No scenarios configured");
        assert_eq!(format_commentary(&[]), "No commentary yet");
    }
}
