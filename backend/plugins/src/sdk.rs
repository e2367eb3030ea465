//! Plugin SDK
//!
//! The contract every plugin satisfies, whether it is linked into the binary
//! or backed by an external executable.

use std::sync::Arc;

use async_trait::async_trait;
use clara_core::{ChatSurface, LlmProvider};
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Shared host context handed to [`Plugin::init`].
#[derive(Clone, Default)]
pub struct PluginContext {
    /// Model the conversation is running against.
    pub model: String,
    /// Backend handle for plugins that want to ask the model themselves.
    pub provider: Option<Arc<dyn LlmProvider>>,
    /// Per-plugin settings keyed by plugin id (`plugins.settings` in the config).
    pub settings: serde_json::Map<String, serde_json::Value>,
    /// Chat window, for plugins that report progress to the operator.
    pub surface: Option<Arc<dyn ChatSurface>>,
}

impl PluginContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_surface(mut self, surface: Arc<dyn ChatSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Map<String, serde_json::Value>) -> Self {
        self.settings = settings;
        self
    }

    /// Settings block for one plugin, `Null` when none was configured.
    pub fn settings_for(&self, id: &str) -> serde_json::Value {
        self.settings.get(id).cloned().unwrap_or_default()
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("settings", &self.settings)
            .field("surface", &self.surface.is_some())
            .finish()
    }
}

/// How a plugin may be called, advertised to the model in the system prompt.
///
/// Same shape as an OpenAI function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the `arguments` mapping.
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called exactly once, before registration. An error aborts the load.
    async fn init(&mut self, ctx: &PluginContext) -> Result<(), PluginError>;

    /// Unique, stable key the model calls this plugin by.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> CallableSchema;

    /// Run the plugin against a JSON object of arguments.
    async fn execute(&self, arguments: &str) -> Result<String, PluginError>;

    /// Per-call deadline overriding the registry default, if any.
    fn call_timeout(&self) -> Option<std::time::Duration> {
        None
    }
}
