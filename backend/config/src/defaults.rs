//! Config defaults.

pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Local models can take minutes on a cold start.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_PLUGINS_DIR: &str = "plugins";
pub const DEFAULT_GENERATED_SUBDIR: &str = "generated";
pub const DEFAULT_MANIFEST_SUFFIX: &str = ".plugin.json";
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_MAX_CHAINED_CALLS: usize = 8;
pub const DEFAULT_MAX_IDENTICAL_CALLS: usize = 2;

/// Ten minutes.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "clara.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_ROTATION: &str = "daily";
