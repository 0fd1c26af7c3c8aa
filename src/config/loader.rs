//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the deployment kind.
pub const NODE_ENV: &str = "NODE_ENV";

/// Any non-empty value enables test mode.
pub const TEST_BUILD_ENV: &str = "SSR_TEST_BUILD";

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
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply the mode and test flags from environment lookups.
///
/// `NODE_ENV=production` selects Prod. `NODE_ENV=test` or a non-empty
/// `SSR_TEST_BUILD` enables test mode. Unset variables leave the file
/// values alone.
pub fn apply_env<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let node_env = lookup(NODE_ENV);
    if let Some(env) = node_env.as_deref() {
        config.production = env == "production";
    }

    let test_build = lookup(TEST_BUILD_ENV).is_some_and(|v| !v.is_empty());
    if node_env.as_deref() == Some("test") || test_build {
        config.test_mode = true;
    }
}

/// Load the optional config file, overlay the process environment and
/// validate.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
