//! Configuration management for the performance championship

mod agent;
mod commentary;
mod device;
mod orchestrator;
mod scenario;
pub mod serde_utils;

pub use agent::{AgentConfig, RetryConfig, DEFAULT_AGENT_PORT};
pub use commentary::{default_commentary_rules, CommentaryRule, Condition};
pub use device::{DeviceProfile, FanCurve, Range, SimulationProfile};
pub use orchestrator::OrchestratorConfig;
pub use scenario::{
    default_loading_messages, default_scenarios, ComparisonRule, Objective, ScenarioDefinition,
};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("perf-championship")
}

/// Default orchestrator config file
pub fn default_orchestrator_config_path() -> PathBuf {
    default_config_dir().join("orchestrator.toml")
}

/// Default agent config file
pub fn default_agent_config_path() -> PathBuf {
    default_config_dir().join("agent.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load a config file, or defaults when it does not exist
pub fn load_or_default<T>(path: &Path) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match load_config(path) {
        Err(ConfigError::NotFound(_)) => {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(T::default())
        }
        other => other,
    }
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_orchestrator_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("orchestrator.toml");

        let mut config = OrchestratorConfig::default();
        config.ipc_port = 6161;
        save_config(&path, &config).unwrap();

        let loaded: OrchestratorConfig = load_config(&path).unwrap();
        assert_eq!(loaded.ipc_port, 6161);
        assert_eq!(loaded.scenarios, config.scenarios);
        assert_eq!(loaded.commentary, config.commentary);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(
            load_config::<AgentConfig>(&path),
            Err(ConfigError::NotFound(_))
        ));
        let config: AgentConfig = load_or_default(&path).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
    }
}
