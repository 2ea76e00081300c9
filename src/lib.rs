pub mod app;
pub mod cli;
pub mod constants;
pub mod models;
pub mod runtime;
pub mod server;
pub mod session;
pub mod utils;

pub use app::{load_config, AppState, Config};
pub use models::{ChatProvider, GroqProvider, ModelRegistry};
pub use server::{create_router, RelayServer};
pub use utils::RelayError;
