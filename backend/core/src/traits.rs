use anyhow::Result;
use async_trait::async_trait;

use crate::message::ChatMessage;

/// Trait for chat-capable LLM backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send the whole transcript and return the model's single reply.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Request to an LLM provider. Always non-streaming.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// The terminal surface the operator chats through.
///
/// Implementations must be cheap to call from the conversation task; the
/// runtime only ever calls them between turns.
pub trait ChatSurface: Send + Sync {
    /// Render one message attributed to `sender`.
    fn add_message(&self, sender: &str, text: &str);

    /// Stop accepting operator input while a turn is being resolved.
    fn disable_input(&self);

    fn enable_input(&self);

    /// Wipe the visible history.
    fn clear(&self);
}
