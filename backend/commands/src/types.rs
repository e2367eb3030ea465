/// Reserved command types.
use serde::{Deserialize, Serialize};

/// What a command does to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    /// Changes conversation or process state.
    Session,
    /// Read-only information for the operator.
    Status,
}

/// A reserved command entry in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key (e.g. "restart", "exit").
    pub key: String,
    pub description: String,
    pub category: CommandCategory,
    /// Literal inputs that trigger the command (must start with '/').
    pub text_aliases: Vec<String>,
}

impl CommandDef {
    /// Primary alias (first in list), or key if none.
    pub fn primary_alias(&self) -> &str {
        self.text_aliases.first().map(|s| s.as_str()).unwrap_or(&self.key)
    }
}

/// A detected command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub key: String,
    pub raw_alias: String,
}
