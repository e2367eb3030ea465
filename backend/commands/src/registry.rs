/// Reserved command registry.
use crate::types::{CommandCategory, CommandDef};

fn command(key: &str, description: &str, category: CommandCategory, aliases: &[&str]) -> CommandDef {
    CommandDef {
        key: key.to_string(),
        description: description.to_string(),
        category,
        text_aliases: aliases.iter().map(|s| s.to_string()).collect(),
    }
}

/// Build the built-in command set.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        command(
            "restart",
            "Start a fresh conversation.",
            CommandCategory::Session,
            &["/restart"],
        ),
        command(
            "exit",
            "Quit the assistant.",
            CommandCategory::Session,
            &["/exit", "/quit"],
        ),
        command("help", "Show available commands.", CommandCategory::Status, &["/help"]),
        command(
            "plugins",
            "List the loaded plugins.",
            CommandCategory::Status,
            &["/plugins"],
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: builtin_commands() }
    }

    /// Register an additional command.
    pub fn register(&mut self, def: CommandDef) {
        self.commands.push(def);
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Find a command whose alias equals `input` exactly.
    pub fn find_by_alias(&self, input: &str) -> Option<&CommandDef> {
        self.commands
            .iter()
            .find(|c| c.text_aliases.iter().any(|a| a == input))
    }

    /// Find a command by its key.
    pub fn find_by_key(&self, key: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|c| c.key == key)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_are_unique_and_slashed() {
        let registry = CommandRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for def in registry.all() {
            for alias in &def.text_aliases {
                assert!(alias.starts_with('/'), "{alias}");
                assert!(seen.insert(alias.clone()), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn test_lookup() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.find_by_alias("/quit").map(|c| c.key.as_str()), Some("exit"));
        assert!(registry.find_by_alias("/RESTART").is_none());
        assert_eq!(registry.find_by_key("help").map(|c| c.primary_alias()), Some("/help"));
    }
}
