use super::types::ShipperConfig;
use crate::config::{expand_env_vars, expand_tilde};
use regex::Regex;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),
}

pub fn load_config(path: &Path) -> Result<ShipperConfig, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);

    check_unexpanded_vars(&yaml_string)?;

    let mut config: ShipperConfig = serde_yaml::from_str(&yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        ))
    })?;

    config.storage.dir = expand_tilde(&config.storage.dir);

    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();

    let unexpanded: Vec<String> = re
        .captures_iter(yaml_string)
        .map(|caps| caps.get(1).unwrap().as_str().to_string())
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    Err(ConfigError::ValidationList(
        unexpanded
            .into_iter()
            .map(|var| format!("environment variable '{}' is not set", var))
            .collect(),
    ))
}

pub fn validate_config(config: &ShipperConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.endpoint.url.is_empty() {
        errors.push("endpoint.url must not be empty".to_string());
    }

    if config.destination.group_name.is_empty() {
        errors.push("destination.group_name must not be empty".to_string());
    }

    if config.destination.stream_name.is_empty() {
        errors.push("destination.stream_name must not be empty".to_string());
    }

    if config.pipeline.queue_capacity == 0 {
        errors.push("pipeline.queue_capacity must be at least 1".to_string());
    }

    if config.storage.dir.as_os_str().is_empty() {
        errors.push("storage.dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
