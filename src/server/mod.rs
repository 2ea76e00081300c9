// Gateway module for server - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod handlers;
mod routes;
mod serve;

// Public re-exports - the ONLY way to access server functionality
pub use handlers::{
    ContextResponse, HealthResponse, ModelInfo, ModelsResponse, PrepareConsensusResponse,
    PrepareStreamResponse, SaveContextRequest, SaveContextResponse,
};
pub use routes::create_router;
pub use serve::RelayServer;
