use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use clara_core::{ChatRequest, ChatResponse, LlmProvider};

/// A scripted LLM provider.
///
/// Replies are served from a queue in order; once the queue is drained the
/// fixed response (if any) is returned. Every request is recorded so callers
/// can inspect exactly what the model was shown.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Queue replies to be returned one per call.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for reply in replies {
            self.push_reply(reply);
        }
        self
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_script().push_back(Ok(reply.into()));
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_script().push_back(Err(message.into()));
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(req.clone());

        let next = self.lock_script().pop_front();
        let content = match next {
            Some(Ok(reply)) => reply,
            Some(Err(message)) => anyhow::bail!("{message}"),
            None => self
                .fixed_response
                .clone()
                .unwrap_or_else(|| "Mock response".to_string()),
        };

        Ok(ChatResponse {
            content,
            provider: self.name.clone(),
            model: req.model.clone(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clara_core::ChatMessage;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            model: "mock".into(),
            messages: vec![ChatMessage::user(text)],
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn test_script_then_fixed_response() {
        let provider = MockProvider::new("mock")
            .with_response("fallback")
            .with_replies(["first", "second"]);
        provider.push_failure("connection refused");

        assert_eq!(provider.chat(&request("a")).await.unwrap().content, "first");
        assert_eq!(provider.chat(&request("b")).await.unwrap().content, "second");
        let err = provider.chat(&request("c")).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(provider.chat(&request("d")).await.unwrap().content, "fallback");

        let seen: Vec<String> = provider
            .requests()
            .iter()
            .map(|r| r.messages[0].content.clone())
            .collect();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }
}
