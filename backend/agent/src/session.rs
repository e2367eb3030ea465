//! The per-process chat session.
//!
//! A [`Session`] owns the single conversation and routes each line of user
//! input either to a reserved command or through the dispatch loop.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clara_commands::{
    build_default_dispatcher, detect_command, CommandDispatcher, CommandHost, CommandRegistry,
    CommandResponse,
};
use clara_core::{Conversation, Role};
use clara_logging::{ConversationEvent, EventLogger};
use tracing::info;

use crate::agent_loop::AgentRunner;
use crate::error::DispatchError;
use crate::system_prompt::PromptBuilder;

/// Outcome of one line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// The model's final answer.
    Reply(String),
    /// A reserved command consumed the input.
    Command(CommandResponse),
}

pub struct Session {
    conversation: Conversation,
    runner: AgentRunner,
    commands: Arc<CommandDispatcher>,
    command_registry: CommandRegistry,
    prime_on_reset: bool,
}

impl Session {
    pub fn new(runner: AgentRunner) -> Self {
        Self {
            conversation: Conversation::new(),
            runner,
            commands: Arc::new(build_default_dispatcher()),
            command_registry: CommandRegistry::new(),
            prime_on_reset: true,
        }
    }

    /// Whether a reset sends the system prompt to the model straight away.
    pub fn with_prime_on_reset(mut self, prime: bool) -> Self {
        self.prime_on_reset = prime;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    /// Clear the conversation and re-establish the system prompt.
    ///
    /// Returns the model's acknowledgement when priming is enabled.
    pub async fn reset(&mut self) -> Result<Option<String>, DispatchError> {
        self.conversation.clear();
        let prompt = PromptBuilder::build(&self.runner.registry().all_schemas());
        self.conversation.push_system(prompt);
        info!(
            conversation = %self.conversation.id(),
            plugins = self.runner.registry().len(),
            "Conversation reset"
        );

        if !self.prime_on_reset {
            return Ok(None);
        }
        self.runner.prime(&mut self.conversation).await.map(Some)
    }

    /// Handle one line of user input.
    ///
    /// Reserved commands never reach the conversation. Everything else is
    /// appended as a user message and dispatched.
    pub async fn handle_input(&mut self, input: &str) -> Result<Turn, DispatchError> {
        if let Some(invocation) = detect_command(input, &self.command_registry) {
            let commands = Arc::clone(&self.commands);
            let response = commands
                .dispatch(self, &invocation)
                .await
                .map_err(DispatchError::Command)?;
            return Ok(Turn::Command(response));
        }

        self.conversation.push_user(input);
        EventLogger::log_event(
            &self.conversation.id().to_string(),
            ConversationEvent::MessageAppended {
                role: Role::User.to_string(),
                content: input.to_string(),
            },
        );

        let answer = self.runner.dispatch(&mut self.conversation).await?;
        Ok(Turn::Reply(answer))
    }
}

#[async_trait]
impl CommandHost for Session {
    async fn restart_conversation(&mut self) -> Result<()> {
        self.reset().await?;
        Ok(())
    }

    fn plugin_descriptors(&self) -> Vec<(String, String)> {
        self.runner.registry().descriptors()
    }
}
