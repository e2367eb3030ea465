//! Structured Logger
//!
//! Wraps `tracing` to provide JSON-formatted output, file rotation (NDJSON),
//! and environment-based level control.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub dir: PathBuf,
    pub file_name: String,
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Mirror records to stderr. Stdout belongs to the conversation.
    pub console: bool,
    /// `daily`, `hourly` or `never`.
    pub rotation: String,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "clara.log".into(),
            level: "info".into(),
            console: false,
            rotation: "daily".into(),
        }
    }
}

fn rotation_from(name: &str) -> Rotation {
    match name.to_ascii_lowercase().as_str() {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

/// Initialize the global structured logger.
///
/// Installs a rolling NDJSON file layer and, when asked, a plain stderr
/// layer. Calling it twice keeps the first subscriber.
pub fn init_logger(options: &LoggerOptions) -> Result<()> {
    fs::create_dir_all(&options.dir)
        .with_context(|| format!("creating log directory {}", options.dir.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    // Rolling file appender: writes NDJSON to `<dir>/clara.log.YYYY-MM-DD`
    let file_appender = RollingFileAppender::new(
        rotation_from(&options.rotation),
        &options.dir,
        &options.file_name,
    );

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let console_layer = options.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation_from("hourly"), Rotation::HOURLY);
        assert_eq!(rotation_from("NEVER"), Rotation::NEVER);
        assert_eq!(rotation_from("daily"), Rotation::DAILY);
        assert_eq!(rotation_from("weekly"), Rotation::DAILY);
    }

    #[test]
    fn test_init_creates_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let options = LoggerOptions {
            dir: tmp.path().join("nested").join("logs"),
            ..LoggerOptions::default()
        };
        init_logger(&options).unwrap();
        assert!(options.dir.is_dir());
        // A second call is harmless.
        init_logger(&options).unwrap();
    }
}
