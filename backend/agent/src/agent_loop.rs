//! Core dispatch loop.
//!
//! One dispatch resolves the current conversation into a final answer,
//! running every plugin call the model asks for along the way.

use std::sync::Arc;

use clara_core::{ChatRequest, Conversation, LlmProvider, Role};
use clara_logging::{ConversationEvent, EventLogger};
use clara_plugins::PluginRegistry;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::loop_detection::LoopDetector;
use crate::response::{interpret, Interpretation};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_name: String,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "llama3".to_string(),
            temperature: 0.7,
        }
    }
}

/// Bounds on a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchLimits {
    /// Plugin calls allowed before the model must answer.
    pub max_chained_calls: usize,
    /// Identical back-to-back calls tolerated before the dispatch is stopped.
    pub max_identical_calls: usize,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_chained_calls: 8,
            max_identical_calls: 2,
        }
    }
}

/// Drives the model/plugin round trips for one conversation at a time.
pub struct AgentRunner {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<PluginRegistry>,
    model: ModelConfig,
    limits: DispatchLimits,
}

impl AgentRunner {
    pub fn new(provider: Arc<dyn LlmProvider>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            provider,
            registry,
            model: ModelConfig::default(),
            limits: DispatchLimits::default(),
        }
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_limits(mut self, limits: DispatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    fn request_for(&self, conversation: &Conversation) -> ChatRequest {
        ChatRequest {
            model: self.model.model_name.clone(),
            messages: conversation.messages().to_vec(),
            temperature: self.model.temperature,
        }
    }

    /// Send the freshly reset conversation once and append the reply verbatim.
    ///
    /// The reply is an acknowledgement of the system prompt, so it is not
    /// interpreted as a plugin call.
    #[instrument(skip_all, fields(conversation = %conversation.id()))]
    pub async fn prime(&self, conversation: &mut Conversation) -> Result<String, DispatchError> {
        let reply = self
            .provider
            .chat(&self.request_for(conversation))
            .await
            .map_err(DispatchError::Transport)?
            .content;
        conversation.push_assistant(reply.clone());
        log_appended(&conversation.id().to_string(), &reply);
        debug!("System prompt acknowledged");
        Ok(reply)
    }

    /// Run the loop until the model produces a final answer.
    ///
    /// The answer is appended to `conversation` and returned. Each plugin
    /// call appends two assistant messages, the call arguments and the
    /// response envelope, before the next backend request. A transport
    /// failure appends nothing for the failed round trip.
    #[instrument(skip_all, fields(conversation = %conversation.id()))]
    pub async fn dispatch(&self, conversation: &mut Conversation) -> Result<String, DispatchError> {
        let conversation_id = conversation.id().to_string();
        let mut detector = LoopDetector::new(self.limits.max_identical_calls);
        let mut calls = 0usize;

        let result = loop {
            let request = self.request_for(conversation);
            debug!(messages = request.messages.len(), "Calling LLM backend");

            let reply = match self.provider.chat(&request).await {
                Ok(response) => response.content,
                Err(e) => break Err(DispatchError::Transport(e)),
            };

            let call = match interpret(&reply) {
                Ok(Interpretation::FinalAnswer(answer)) => {
                    conversation.push_assistant(answer.clone());
                    log_appended(&conversation_id, &answer);
                    info!(plugin_calls = calls, "Dispatch produced final answer");
                    break Ok(answer);
                }
                Ok(Interpretation::FunctionCall(call)) => call,
                Err(e) => break Err(e),
            };

            calls += 1;
            if calls > self.limits.max_chained_calls {
                break Err(DispatchError::TooManyChainedCalls {
                    limit: self.limits.max_chained_calls,
                });
            }

            let arguments = call.arguments_json();
            if detector.record(&call.name, &arguments) {
                break Err(DispatchError::RepeatedCall { name: call.name });
            }

            info!(plugin = %call.name, "Model requested plugin call");
            EventLogger::log_event(
                &conversation_id,
                ConversationEvent::PluginCall {
                    plugin: call.name.clone(),
                    arguments: arguments.clone(),
                },
            );

            let envelope = self.registry.invoke(&call.name, &arguments).await.to_json();
            EventLogger::log_event(
                &conversation_id,
                ConversationEvent::PluginResult {
                    plugin: call.name.clone(),
                    envelope: envelope.clone(),
                },
            );

            conversation.push_assistant(arguments.clone());
            log_appended(&conversation_id, &arguments);
            conversation.push_assistant(envelope.clone());
            log_appended(&conversation_id, &envelope);
        };

        if let Err(e) = &result {
            warn!(error = %e, "Dispatch failed");
            EventLogger::log_event(
                &conversation_id,
                ConversationEvent::DispatchError { error: e.to_string() },
            );
        }
        result
    }
}

fn log_appended(conversation_id: &str, content: &str) {
    EventLogger::log_event(
        conversation_id,
        ConversationEvent::MessageAppended {
            role: Role::Assistant.to_string(),
            content: content.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};
    use clara_plugins::{DateTimePlugin, Plugin, PluginContext};
    use clara_providers::MockProvider;
    use serde_json::Value;

    const DATETIME_CALL: &str = r#"{"plugin": "datetime", "arguments": {"input": "now"}}"#;

    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-13T10:30:00+01:00").unwrap()
    }

    async fn registry() -> Arc<PluginRegistry> {
        let mut registry = PluginRegistry::new();
        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(DateTimePlugin::with_clock(fixed_now))];
        registry
            .load_all(plugins, &PluginContext::new("mock"))
            .await
            .unwrap();
        Arc::new(registry)
    }

    async fn runner(provider: Arc<MockProvider>) -> AgentRunner {
        AgentRunner::new(provider, registry().await)
    }

    fn conversation() -> Conversation {
        let mut conversation = Conversation::new();
        conversation.push_system("system prompt");
        conversation.push_user("What time is it?");
        conversation
    }

    #[tokio::test]
    async fn test_final_answer_appended_and_returned() {
        let provider = Arc::new(MockProvider::new("mock").with_replies(["Hello there."]));
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        let answer = runner.dispatch(&mut conv).await.unwrap();
        assert_eq!(answer, "Hello there.");
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.last().unwrap().role, Role::Assistant);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_call_appends_two_messages_before_next_request() {
        let provider = Arc::new(
            MockProvider::new("mock").with_replies([DATETIME_CALL, "It is half past ten."]),
        );
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        let answer = runner.dispatch(&mut conv).await.unwrap();
        assert_eq!(answer, "It is half past ten.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[1].messages.len(), 4);

        let call = &requests[1].messages[2];
        assert_eq!(call.role, Role::Assistant);
        assert_eq!(call.content, r#"{"input":"now"}"#);

        let envelope: Value = serde_json::from_str(&requests[1].messages[3].content).unwrap();
        assert_eq!(envelope["result"], "2024-03-13T10:30:00+01:00");

        assert_eq!(conv.len(), 5);
    }

    #[tokio::test]
    async fn test_prime_appends_reply_without_interpreting() {
        let provider = Arc::new(MockProvider::new("mock").with_replies([DATETIME_CALL]));
        let runner = runner(provider.clone()).await;
        let mut conv = Conversation::new();
        conv.push_system("system prompt");

        let reply = runner.prime(&mut conv).await.unwrap();
        assert_eq!(reply, DATETIME_CALL);
        assert_eq!(conv.len(), 2);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_request_uses_model_config() {
        let provider = Arc::new(MockProvider::new("mock"));
        let runner = runner(provider.clone()).await.with_model(ModelConfig {
            model_name: "mistral".into(),
            temperature: 0.2,
        });
        runner.dispatch(&mut conversation()).await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.model, "mistral");
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_unknown_plugin_fed_back_as_error_envelope() {
        let provider = Arc::new(MockProvider::new("mock").with_replies([
            r#"{"plugin": "weather", "arguments": {"city": "Oslo"}}"#,
            "Sorry, I cannot check the weather.",
        ]));
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        runner.dispatch(&mut conv).await.unwrap();
        let envelope: Value = serde_json::from_str(&conv.messages()[3].content).unwrap();
        assert!(envelope["error"].as_str().unwrap().contains("not found"));
        assert!(envelope.get("result").is_none());
    }

    #[tokio::test]
    async fn test_bad_arguments_become_error_envelope() {
        let provider = Arc::new(MockProvider::new("mock").with_replies([
            r#"{"plugin": "datetime", "arguments": {}}"#,
            "I need a date.",
        ]));
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        assert_eq!(runner.dispatch(&mut conv).await.unwrap(), "I need a date.");
        let envelope: Value = serde_json::from_str(&conv.messages()[3].content).unwrap();
        assert!(envelope.get("error").is_some());
    }

    #[tokio::test]
    async fn test_transport_failure_appends_nothing() {
        let provider = Arc::new(MockProvider::new("mock"));
        provider.push_failure("connection refused");
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        let err = runner.dispatch(&mut conv).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(conv.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_call_is_reported() {
        let provider = Arc::new(
            MockProvider::new("mock").with_replies([r#"{"plugin": "datetime", "arguments": "#]),
        );
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        let err = runner.dispatch(&mut conv).await.unwrap_err();
        assert!(matches!(err, DispatchError::MalformedCall { .. }));
        assert_eq!(conv.len(), 2);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_chain_limit() {
        let provider = Arc::new(MockProvider::new("mock").with_replies([
            r#"{"plugin": "datetime", "arguments": {"input": "today"}}"#,
            r#"{"plugin": "datetime", "arguments": {"input": "tomorrow"}}"#,
            r#"{"plugin": "datetime", "arguments": {"input": "yesterday"}}"#,
        ]));
        let runner = runner(provider.clone()).await.with_limits(DispatchLimits {
            max_chained_calls: 2,
            max_identical_calls: 2,
        });
        let mut conv = conversation();

        let err = runner.dispatch(&mut conv).await.unwrap_err();
        assert!(matches!(err, DispatchError::TooManyChainedCalls { limit: 2 }));
        // Two completed calls, each with call + result.
        assert_eq!(conv.len(), 6);
    }

    #[tokio::test]
    async fn test_repeated_identical_call_stops_dispatch() {
        let provider = Arc::new(MockProvider::new("mock").with_response(DATETIME_CALL));
        let runner = runner(provider.clone()).await;
        let mut conv = conversation();

        let err = runner.dispatch(&mut conv).await.unwrap_err();
        assert!(matches!(err, DispatchError::RepeatedCall { ref name } if name == "datetime"));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(conv.len(), 6);
    }
}
