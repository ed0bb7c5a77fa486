//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ConductorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `paths.conf_dir`.
pub const ENV_CONF_PATH: &str = "CONF_PATH";
/// Overrides `paths.proxy_dir`.
pub const ENV_PROXY_PATH: &str = "HAPROXY_PATH";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ConductorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `CONF_PATH` / `HAPROXY_PATH` through the supplied lookup.
pub fn apply_env_overrides<F>(config: &mut ConductorConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(ENV_CONF_PATH).filter(|v| !v.is_empty()) {
        config.paths.conf_dir = PathBuf::from(dir);
    }
    if let Some(dir) = lookup(ENV_PROXY_PATH).filter(|v| !v.is_empty()) {
        config.paths.proxy_dir = PathBuf::from(dir);
    }
}

/// Load (or default), apply environment overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ConductorConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ConductorConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
