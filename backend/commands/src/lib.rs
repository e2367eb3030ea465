pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod types;

pub use detection::detect_command;
pub use dispatch::{CommandDispatcher, CommandHandler, CommandHost, CommandResponse, Control};
pub use handlers::{ExitHandler, HelpHandler, PluginsHandler, RestartHandler};
pub use registry::{builtin_commands, CommandRegistry};
pub use types::{CommandCategory, CommandDef, CommandInvocation};

/// Build a dispatcher pre-wired with all built-in handlers.
pub fn build_default_dispatcher() -> CommandDispatcher {
    use std::sync::Arc;

    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register("restart", Arc::new(RestartHandler));
    dispatcher.register("exit", Arc::new(ExitHandler));
    dispatcher.register("help", Arc::new(HelpHandler { registry: CommandRegistry::new() }));
    dispatcher.register("plugins", Arc::new(PluginsHandler));
    dispatcher
}
