/// Command dispatch: route detected commands to handler functions.
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::CommandInvocation;

// ---------------------------------------------------------------------------
// Host + handler traits
// ---------------------------------------------------------------------------

/// The session a command acts on.
#[async_trait]
pub trait CommandHost: Send {
    /// Clear the conversation and re-send the system prompt.
    async fn restart_conversation(&mut self) -> Result<()>;

    /// `(id, description)` of every loaded plugin.
    fn plugin_descriptors(&self) -> Vec<(String, String)>;
}

/// What the host should do after showing the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Conversation was reset; the host should clear its screen.
    Restarted,
    /// Stop the process.
    Exit,
}

/// The result returned by a command handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub text: String,
    pub control: Control,
}

impl CommandResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), control: Control::Continue }
    }

    pub fn restarted(text: impl Into<String>) -> Self {
        Self { text: text.into(), control: Control::Restarted }
    }

    pub fn exit(text: impl Into<String>) -> Self {
        Self { text: text.into(), control: Control::Exit }
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        host: &mut dyn CommandHost,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    pub async fn dispatch(
        &self,
        host: &mut dyn CommandHost,
        inv: &CommandInvocation,
    ) -> Result<CommandResponse> {
        if let Some(handler) = self.handlers.get(&inv.key) {
            info!(command = %inv.raw_alias, "[Commands] Dispatching");
            handler.handle(host, inv).await
        } else {
            Ok(CommandResponse::ok(format!(
                "No handler registered for command {}", inv.raw_alias
            )))
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self { Self::new() }
}
