// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod groq;
mod registry;
mod traits;
mod types;

// Public re-exports - the ONLY way to access model functionality
pub use groq::GroqProvider;
pub use registry::{ModelRegistry, BASELINE_MODEL};
pub use traits::ChatProvider;
#[cfg(test)]
pub use traits::MockChatProvider;
pub use types::{
    ChatMessage, ClientMessage, MessageRole, ModelConfig, ModelResponse, ReasoningEffort,
    StreamCallback, TokenUsage,
};
