// Gateway module for utils - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod errors;
mod logger;
mod tokenizer;

// Public re-exports - the ONLY way to access utils functionality
pub use errors::{ErrorResponse, RelayError};
pub use logger::init_logger;
pub use tokenizer::{estimate_message_tokens, estimate_tokens};
