// Gateway module for session - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod context;
mod store;
mod summarizer;

// Public re-exports - the ONLY way to access session functionality
pub use context::{ContextStore, SaveOutcome, StoredContext};
pub use store::SessionStore;
pub use summarizer::Summarizer;
