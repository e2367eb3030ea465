//! Structured logging for Clara.
//!
//! Handles subscriber setup (rolling NDJSON file plus optional console),
//! conversation event records and secret redaction.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ConversationEvent, EventLogEntry, EventLogger};
pub use logger::{init_logger, LoggerOptions};
pub use redact::redact_sensitive_data;
