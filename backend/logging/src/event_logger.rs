//! Conversation Event Logger
//!
//! Structured events (message, plugin call, plugin result, error) written to
//! the rolling NDJSON log under the `conversation_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    MessageAppended {
        role: String,
        content: String,
    },
    PluginCall {
        plugin: String,
        arguments: String,
    },
    PluginResult {
        plugin: String,
        envelope: String,
    },
    DispatchError {
        error: String,
    },
}

impl ConversationEvent {
    fn redacted(mut self) -> Self {
        match &mut self {
            ConversationEvent::MessageAppended { content, .. } => {
                *content = redact_sensitive_data(content);
            }
            ConversationEvent::PluginCall { arguments, .. } => {
                *arguments = redact_sensitive_data(arguments);
            }
            ConversationEvent::PluginResult { envelope, .. } => {
                *envelope = redact_sensitive_data(envelope);
            }
            ConversationEvent::DispatchError { error } => {
                *error = redact_sensitive_data(error);
            }
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ConversationEvent,
}

impl EventLogEntry {
    pub fn new(conversation_id: impl Into<String>, event: ConversationEvent) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            timestamp: Utc::now(),
            event: event.redacted(),
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Redacts the event and emits it as one structured record.
    pub fn log_event(conversation_id: &str, event: ConversationEvent) {
        let entry = EventLogEntry::new(conversation_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "conversation_events", event = %json, "Conversation event");
    }
}
