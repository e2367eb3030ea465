pub mod builtin;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod sdk;

pub use builtin::{builtin_plugins, DateTimePlugin};
pub use envelope::PluginResponse;
pub use error::PluginError;
pub use loader::{discover, ExternalPlugin, DEFAULT_MANIFEST_SUFFIX};
pub use manifest::PluginManifest;
pub use registry::{PluginRegistry, DEFAULT_CALL_TIMEOUT};
pub use sdk::{CallableSchema, Plugin, PluginContext};
