//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the build definition file in a project root.
pub const CONFIG_FILE: &str = "artifex.toml";

/// Loads and validates `<project_dir>/artifex.toml`.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a build definition from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates an `artifex.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.targets.is_empty() {
        return Err(ConfigError::ValidationError(
            "no targets defined; add a [targets.<name>] section".to_string(),
        ));
    }
    for (name, target) in &config.targets {
        if target.sources.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::MissingField(format!("targets.{name}.sources")));
        }
        if target.cc.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("targets.{name}.cc")));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "target name '{name}' must not contain path separators"
            )));
        }
    }
    Ok(())
}
