use thiserror::Error;

/// Top-level error type for the Clara runtime.
#[derive(Debug, Error)]
pub enum ClaraError {
    #[error("startup failed: {0}")]
    Startup(String),

    #[error("unknown LLM provider '{0}'")]
    UnknownProvider(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
