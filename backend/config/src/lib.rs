//! `clara-config`: Clara runtime configuration.
//!
//! Provides:
//! - Typed config schema with per-section defaults
//! - YAML loading from the config directory
//! - `${ENV_VAR}` substitution
//! - Validation with warnings and errors

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw};
pub use schema::{
    ClaraConfig, DispatchConfig, LoggingConfig, ModelConfig, PluginsConfig, SessionConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load, substitute env vars, apply defaults and validate a config file.
///
/// Validation warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<ClaraConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    let config: ClaraConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    check(&config)?;
    Ok(config)
}

/// Log the validation report and turn errors into a failure.
pub fn check(config: &ClaraConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("invalid configuration ({} error(s)); first: {first}", report.errors.len());
    }
    Ok(())
}
