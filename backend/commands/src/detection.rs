/// Reserved command detection.
///
/// Matching is exact: the whole input must equal an alias, byte for byte.
/// `"/restart now"` or `" /restart"` are ordinary messages for the model.
use crate::registry::CommandRegistry;
use crate::types::CommandInvocation;

pub fn detect_command(text: &str, registry: &CommandRegistry) -> Option<CommandInvocation> {
    if !text.starts_with('/') {
        return None;
    }

    let def = registry.find_by_alias(text)?;
    Some(CommandInvocation {
        key: def.key.clone(),
        raw_alias: text.to_string(),
    })
}
