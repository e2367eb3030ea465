//! Config validation with field paths in every message.

use thiserror::Error;

use crate::schema::ClaraConfig;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &ClaraConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_model(config, &mut report);
    validate_plugins(config, &mut report);
    validate_dispatch(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_model(config: &ClaraConfig, report: &mut ValidationReport) {
    let model = &config.model;
    if model.name.trim().is_empty() {
        report.error("model.name", "Model name cannot be empty");
    }
    if model.provider.trim().is_empty() {
        report.error("model.provider", "Provider cannot be empty");
    }
    if !(model.base_url.starts_with("http://") || model.base_url.starts_with("https://")) {
        report.error("model.baseUrl", "Base URL must start with http:// or https://");
    }
    if model.request_timeout_secs == 0 {
        report.error("model.requestTimeoutSecs", "Request timeout must be greater than 0");
    }
    if !(0.0..=2.0).contains(&model.temperature) {
        report.warn("model.temperature", "Temperature outside the usual 0.0-2.0 range");
    }
}

fn validate_plugins(config: &ClaraConfig, report: &mut ValidationReport) {
    let plugins = &config.plugins;
    if plugins.dir.trim().is_empty() {
        report.error("plugins.dir", "Plugin directory cannot be empty");
    }
    if plugins.manifest_suffix.trim().is_empty() {
        report.error("plugins.manifestSuffix", "Manifest suffix cannot be empty");
    }
    if plugins.call_timeout_secs == 0 {
        report.error("plugins.callTimeoutSecs", "Call timeout must be greater than 0");
    }
    for (id, settings) in &plugins.settings {
        if !settings.is_object() {
            report.warn(
                format!("plugins.settings.{id}"),
                "Plugin settings are usually an object",
            );
        }
    }
}

fn validate_dispatch(config: &ClaraConfig, report: &mut ValidationReport) {
    let dispatch = &config.dispatch;
    if dispatch.max_chained_calls == 0 {
        report.error("dispatch.maxChainedCalls", "Must allow at least one plugin call");
    }
    if dispatch.max_identical_calls == 0 {
        report.error("dispatch.maxIdenticalCalls", "Must allow at least one call");
    } else if dispatch.max_identical_calls > dispatch.max_chained_calls {
        report.warn(
            "dispatch.maxIdenticalCalls",
            "Larger than maxChainedCalls; the chain limit will trigger first",
        );
    }
}

fn validate_logging(config: &ClaraConfig, report: &mut ValidationReport) {
    let logging = &config.logging;
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
        report.warn(
            "logging.level",
            format!("Unknown log level '{}'; will be used as a filter directive", logging.level),
        );
    }
    let valid_rotations = ["daily", "hourly", "never"];
    if !valid_rotations.contains(&logging.rotation.to_lowercase().as_str()) {
        report.warn(
            "logging.rotation",
            format!("Unknown rotation '{}'; using daily", logging.rotation),
        );
    }
    if logging.file_name.trim().is_empty() {
        report.error("logging.fileName", "Log file name cannot be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate(&ClaraConfig::default());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = ClaraConfig::default();
        config.dispatch.max_chained_calls = 0;
        config.plugins.call_timeout_secs = 0;
        config.model.request_timeout_secs = 0;
        let report = validate(&config);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"model.requestTimeoutSecs"));
        assert!(paths.contains(&"dispatch.maxChainedCalls"));
        assert!(paths.contains(&"plugins.callTimeoutSecs"));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = ClaraConfig::default();
        config.model.base_url = "localhost:11434".into();
        assert!(!validate(&config).is_valid());
    }

    #[test]
    fn test_unknown_rotation_warns() {
        let mut config = ClaraConfig::default();
        config.logging.rotation = "weekly".into();
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "logging.rotation");
    }
}
