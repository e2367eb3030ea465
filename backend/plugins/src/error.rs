use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading or running plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin with ID {0} not found")]
    NotFound(String),

    #[error("failed to initialize plugin '{id}': {source}")]
    Init {
        id: String,
        #[source]
        source: Box<PluginError>,
    },

    #[error("invalid plugin manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("failed to read plugin directory {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate plugin ID '{id}'")]
    DuplicateId { id: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),

    #[error("plugin '{id}' timed out after {}s", .after.as_secs())]
    Timeout { id: String, after: Duration },

    #[error("plugin '{id}' panicked: {message}")]
    Panicked { id: String, message: String },
}

impl PluginError {
    pub fn init(id: impl Into<String>, source: PluginError) -> Self {
        PluginError::Init {
            id: id.into(),
            source: Box::new(source),
        }
    }
}
