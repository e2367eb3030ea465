//! Append-only conversation transcript.

use tracing::debug;
use uuid::Uuid;

use crate::message::{ChatMessage, Role};

/// Ordered record of every message exchanged in a session.
///
/// The only mutations are [`Conversation::push`] and [`Conversation::clear`];
/// messages are never reordered, edited or deduplicated.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
        }
    }

    /// Identifier used to correlate log lines; changes on every clear.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
        debug!(conversation = %self.id, role = %role, len = self.messages.len(), "Message appended");
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(Role::System, content);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content);
    }

    /// Drop every message and start a fresh transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.id = Uuid::new_v4();
        debug!(conversation = %self.id, "Conversation cleared");
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
