//! Clara runtime configuration schema.
//!
//! Every section is optional in the file; missing keys take the defaults
//! from [`crate::defaults`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaraConfig {
    pub model: ModelConfig,
    pub plugins: PluginsConfig,
    pub dispatch: DispatchConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Model backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    /// Provider id as registered by the binary, e.g. `ollama`.
    pub provider: String,
    pub name: String,
    pub base_url: String,
    pub temperature: f32,
    /// Deadline for one backend round trip.
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: defaults::DEFAULT_PROVIDER.to_string(),
            name: defaults::DEFAULT_MODEL.to_string(),
            base_url: defaults::DEFAULT_OLLAMA_URL.to_string(),
            temperature: defaults::DEFAULT_TEMPERATURE,
            request_timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Plugins
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginsConfig {
    /// Primary plugin directory.
    pub dir: String,
    /// Sub-directory of `dir` scanned as well.
    pub generated_subdir: String,
    pub manifest_suffix: String,
    pub call_timeout_secs: u64,
    /// Per-plugin settings keyed by plugin id.
    pub settings: Map<String, Value>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: defaults::DEFAULT_PLUGINS_DIR.to_string(),
            generated_subdir: defaults::DEFAULT_GENERATED_SUBDIR.to_string(),
            manifest_suffix: defaults::DEFAULT_MANIFEST_SUFFIX.to_string(),
            call_timeout_secs: defaults::DEFAULT_CALL_TIMEOUT_SECS,
            settings: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchConfig {
    pub max_chained_calls: usize,
    pub max_identical_calls: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_chained_calls: defaults::DEFAULT_MAX_CHAINED_CALLS,
            max_identical_calls: defaults::DEFAULT_MAX_IDENTICAL_CALLS,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Send the system prompt to the model right after each reset.
    pub prime_on_reset: bool,
    /// Exit after this many seconds without input. `0` disables the timeout.
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prime_on_reset: true,
            idle_timeout_secs: defaults::DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_name: String,
    pub level: String,
    pub console: bool,
    /// `daily`, `hourly` or `never`.
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: defaults::DEFAULT_LOG_DIR.to_string(),
            file_name: defaults::DEFAULT_LOG_FILE.to_string(),
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            console: false,
            rotation: defaults::DEFAULT_LOG_ROTATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
model:
  name: mistral
plugins:
  callTimeoutSecs: 5
  settings:
    weather:
      units: metric
"#;
        let config: ClaraConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model.name, "mistral");
        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.plugins.call_timeout_secs, 5);
        assert_eq!(config.plugins.dir, "plugins");
        assert_eq!(config.plugins.settings["weather"]["units"], "metric");
        assert_eq!(config.dispatch, DispatchConfig::default());
        assert!(config.session.prime_on_reset);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: ClaraConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ClaraConfig::default());
    }
}
