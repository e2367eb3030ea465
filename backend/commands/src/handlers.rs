/// Built-in command handlers.
///
/// Each handler is a concrete struct implementing `CommandHandler`.
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::dispatch::{CommandHandler, CommandHost, CommandResponse};
use crate::registry::CommandRegistry;
use crate::types::{CommandCategory, CommandInvocation};

// ---------------------------------------------------------------------------
// /restart
// ---------------------------------------------------------------------------

pub struct RestartHandler;

#[async_trait]
impl CommandHandler for RestartHandler {
    async fn handle(&self, host: &mut dyn CommandHost, _inv: &CommandInvocation) -> Result<CommandResponse> {
        info!("[Commands] Restart command received");
        host.restart_conversation().await?;
        Ok(CommandResponse::restarted("Conversation restarted"))
    }
}

// ---------------------------------------------------------------------------
// /exit
// ---------------------------------------------------------------------------

pub struct ExitHandler;

#[async_trait]
impl CommandHandler for ExitHandler {
    async fn handle(&self, _host: &mut dyn CommandHost, _inv: &CommandInvocation) -> Result<CommandResponse> {
        info!("[Commands] Exit command received");
        Ok(CommandResponse::exit("Exiting..."))
    }
}

// ---------------------------------------------------------------------------
// /help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub registry: CommandRegistry,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, _host: &mut dyn CommandHost, _inv: &CommandInvocation) -> Result<CommandResponse> {
        let mut lines = vec!["Available commands:".to_string()];
        for (category, heading) in [(CommandCategory::Session, "Session"), (CommandCategory::Status, "Info")] {
            lines.push(format!("{heading}:"));
            for cmd in self.registry.all().iter().filter(|c| c.category == category) {
                lines.push(format!("  {:<14} {}", cmd.text_aliases.join(", "), cmd.description));
            }
        }
        Ok(CommandResponse::ok(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// /plugins
// ---------------------------------------------------------------------------

pub struct PluginsHandler;

#[async_trait]
impl CommandHandler for PluginsHandler {
    async fn handle(&self, host: &mut dyn CommandHost, _inv: &CommandInvocation) -> Result<CommandResponse> {
        let plugins = host.plugin_descriptors();
        if plugins.is_empty() {
            return Ok(CommandResponse::ok("No plugins loaded."));
        }
        let mut lines = vec![format!("Loaded plugins ({}):", plugins.len())];
        for (id, description) in plugins {
            lines.push(format!("  {id}: {description}"));
        }
        Ok(CommandResponse::ok(lines.join("\n")))
    }
}
