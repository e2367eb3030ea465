use thiserror::Error;

/// Recoverable failures of a single dispatch. None of them end the process.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The backend call itself failed; nothing from this round trip was appended.
    #[error("LLM backend request failed: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// The reply looked like a plugin call but could not be parsed as one.
    #[error("malformed plugin call from model: {reason}")]
    MalformedCall { reason: String },

    #[error("too many chained plugin calls (limit {limit})")]
    TooManyChainedCalls { limit: usize },

    #[error("model repeated the same call to plugin '{name}'")]
    RepeatedCall { name: String },

    #[error("command failed: {0:#}")]
    Command(#[source] anyhow::Error),
}
