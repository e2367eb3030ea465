//! Clara Agent Runner
//!
//! The dispatch loop between the model and the plugin registry, including the
//! system prompt, reply interpretation and the per-session conversation owner.

pub mod agent_loop;
pub mod error;
pub mod loop_detection;
pub mod response;
pub mod session;
pub mod system_prompt;

pub use agent_loop::{AgentRunner, DispatchLimits, ModelConfig};
pub use error::DispatchError;
pub use loop_detection::LoopDetector;
pub use response::{interpret, FunctionCall, Interpretation};
pub use session::{Session, Turn};
pub use system_prompt::PromptBuilder;
