use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use clara_core::{ChatMessage, ChatRequest, ChatResponse, LlmProvider};

/// Default address of a local Ollama daemon.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Upper bound on one chat round trip, connection included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Ollama local LLM provider.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_default()
}

impl OllamaProvider {
    pub fn new() -> Self {
        Self {
            client: build_client(DEFAULT_REQUEST_TIMEOUT),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaReplyMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaReplyMessage,
    eval_count: Option<u64>,
    prompt_eval_count: Option<u64>,
}

fn build_body(request: &ChatRequest) -> OllamaChatRequest<'_> {
    OllamaChatRequest {
        model: &request.model,
        messages: &request.messages,
        stream: false,
        options: OllamaOptions {
            temperature: request.temperature,
        },
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        let body = build_body(request);

        debug!(model = %request.model, messages = request.messages.len(), "Sending request to Ollama");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .context("Ollama HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama returned {}: {}", status, error_body);
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        let tokens_used = chat_response.eval_count.unwrap_or(0)
            + chat_response.prompt_eval_count.unwrap_or(0);

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(tokens_used, latency_ms, "Ollama replied");

        Ok(ChatResponse {
            content: chat_response.message.content,
            provider: "ollama".to_string(),
            model: request.model.clone(),
            tokens_used,
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_is_non_streaming_transcript() {
        let request = ChatRequest {
            model: "llama3".into(),
            messages: vec![ChatMessage::system("prompt"), ChatMessage::user("hi")],
            temperature: 0.2,
        };
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "prompt" },
                { "role": "user", "content": "hi" }
            ])
        );
    }

    #[test]
    fn test_response_parsing_ignores_extra_fields() {
        let raw = r#"{"model":"llama3","created_at":"2024-01-01T00:00:00Z",
            "message":{"role":"assistant","content":"Hello!"},"done":true,"eval_count":7}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "Hello!");
        assert_eq!(parsed.eval_count, Some(7));
        assert_eq!(parsed.prompt_eval_count, None);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OllamaProvider::new().with_base_url("http://gpu-box:11434/");
        assert_eq!(provider.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(OllamaProvider::new().timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections and never answer.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = OllamaProvider::new()
            .with_base_url(format!("http://{addr}"))
            .with_timeout(Duration::from_millis(200));
        let request = ChatRequest {
            model: "llama3".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.2,
        };

        let started = Instant::now();
        let err = provider.chat(&request).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(format!("{err:#}").contains("Ollama HTTP request failed"));
    }
}
