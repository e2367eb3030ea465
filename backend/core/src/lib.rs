pub mod conversation;
pub mod error;
pub mod message;
pub mod traits;

pub use conversation::Conversation;
pub use error::ClaraError;
pub use message::{ChatMessage, Role};
pub use traits::{ChatRequest, ChatResponse, ChatSurface, LlmProvider};
