//! Config command implementations
//!
//! The orchestrator and the agent keep separate files; every command works
//! on one of them, chosen by `ConfigTarget` unless an explicit path is given.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::output::{print_error, print_info, print_success, print_warning};
use pc_core::config::{self, AgentConfig, OrchestratorConfig};

/// Which config file a command works on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConfigTarget {
    #[default]
    Orchestrator,
    Agent,
}

impl ConfigTarget {
    fn default_path(self) -> PathBuf {
        match self {
            ConfigTarget::Orchestrator => config::default_orchestrator_config_path(),
            ConfigTarget::Agent => config::default_agent_config_path(),
        }
    }
}

/// Resolve the file a command should use
pub fn config_path(config_path: Option<&PathBuf>, target: ConfigTarget) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(|| target.default_path())
}

/// Get a config value by dotted key
pub fn config_get(config_path: Option<&PathBuf>, target: ConfigTarget, key: &str) -> Result<()> {
    let path = self::config_path(config_path, target);
    let Some(table) = read_table(&path)? else {
        return Ok(());
    };

    // Navigate through the key path (e.g., "retry.max_attempts")
    let mut current = &toml::Value::Table(table);
    for part in key.split('.') {
        match current.as_table().and_then(|t| t.get(part)) {
            Some(v) => current = v,
            None => anyhow::bail!("Key not found: {}", key),
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Integer(i) => println!("{}", i),
        toml::Value::Float(f) => println!("{}", f),
        toml::Value::Boolean(b) => println!("{}", b),
        toml::Value::Array(a) => {
            for item in a {
                println!("{}", item);
            }
        }
        toml::Value::Table(_) => {
            println!("{}", toml::to_string_pretty(current)?);
        }
        toml::Value::Datetime(d) => println!("{}", d),
    }

    Ok(())
}

/// Set a config value by dotted key
///
/// The edited file must still parse as the target's config type, otherwise
/// nothing is written.
pub fn config_set(
    config_path: Option<&PathBuf>,
    target: ConfigTarget,
    key: &str,
    value: &str,
) -> Result<()> {
    let path = self::config_path(config_path, target);

    if !path.exists() {
        print_info("Creating default configuration...");
        config_init(Some(&path), target, false)?;
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let mut table: toml::Table =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    let parts: Vec<&str> = key.split('.').collect();
    let (last_key, parents) = parts
        .split_last()
        .filter(|(last, _)| !last.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Invalid key: key path cannot be empty"))?;

    let mut current = &mut table;
    for part in parents {
        if !current.contains_key(*part) {
            current.insert(part.to_string(), toml::Value::Table(toml::Table::new()));
        }
        current = current
            .get_mut(*part)
            .and_then(|v| v.as_table_mut())
            .ok_or_else(|| anyhow::anyhow!("Cannot navigate to key: {}", key))?;
    }

    current.insert(last_key.to_string(), parse_value(value));

    let new_content = toml::to_string_pretty(&table)?;
    validate(&new_content, target).with_context(|| format!("Refusing to set {}", key))?;

    std::fs::write(&path, new_content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Show current configuration
pub fn config_show(config_path: Option<&PathBuf>, target: ConfigTarget) -> Result<()> {
    let path = self::config_path(config_path, target);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'perf-championship config init' to create one");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Write the default configuration for a target
pub fn config_init(config_path: Option<&PathBuf>, target: ConfigTarget, force: bool) -> Result<()> {
    let path = self::config_path(config_path, target);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    match target {
        ConfigTarget::Orchestrator => config::save_config(&path, &OrchestratorConfig::default()),
        ConfigTarget::Agent => config::save_config(&path, &AgentConfig::default()),
    }
    .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

/// Open config in editor
pub fn config_edit(config_path: Option<&PathBuf>, target: ConfigTarget) -> Result<()> {
    let path = self::config_path(config_path, target);

    if !path.exists() {
        print_error(&format!("Config file not found: {:?}", path));
        print_info("Run 'perf-championship config init' to create one");
        return Ok(());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "vi".to_string()
            }
        });

    print_info(&format!("Opening config with: {}", editor));

    std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to open editor: {}", editor))?;

    Ok(())
}

fn read_table(path: &Path) -> Result<Option<toml::Table>> {
    if !path.exists() {
        print_error(&format!("Config file not found: {:?}", path));
        print_info("Run 'perf-championship config init' to create one");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let table = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    Ok(Some(table))
}

/// Interpret a command-line value as the most specific TOML type
fn parse_value(value: &str) -> toml::Value {
    if value == "true" {
        toml::Value::Boolean(true)
    } else if value == "false" {
        toml::Value::Boolean(false)
    } else if let Ok(i) = value.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn validate(content: &str, target: ConfigTarget) -> Result<()> {
    match target {
        ConfigTarget::Orchestrator => {
            let parsed: OrchestratorConfig = toml::from_str(content)?;
            parsed.validate()?;
        }
        ConfigTarget::Agent => {
            let parsed: AgentConfig = toml::from_str(content)?;
            parsed.validate()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("7"), toml::Value::Integer(7));
        assert_eq!(parse_value("2.5"), toml::Value::Float(2.5));
        assert_eq!(
            parse_value("10.0.0.5:5000"),
            toml::Value::String("10.0.0.5:5000".into())
        );
    }

    #[test]
    fn test_init_then_set_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");

        config_init(Some(&path), ConfigTarget::Agent, false).unwrap();
        config_set(Some(&path), ConfigTarget::Agent, "retry.max_attempts", "9").unwrap();

        let loaded: AgentConfig = config::load_config(&path).unwrap();
        assert_eq!(loaded.retry.max_attempts, 9);
    }

    #[test]
    fn test_set_rejects_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orchestrator.toml");
        config_init(Some(&path), ConfigTarget::Orchestrator, false).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(config_set(Some(&path), ConfigTarget::Orchestrator, "ipc_port", "lots").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/tmp/custom.toml");
        assert_eq!(config_path(Some(&explicit), ConfigTarget::Agent), explicit);
        assert!(config_path(None, ConfigTarget::Agent).ends_with("agent.toml"));
    }
}
