//! Runtime module - Gateway
//!
//! Stream preparation and execution for single-model and consensus modes.

mod consensus;
mod events;
mod history;
mod messages;
mod selection;
mod stream;

pub use consensus::{
    ConsensusOrchestrator, ConsensusRequest, ConsensusSession, PhaseResponse,
};
pub use events::{ConsensusEvent, StreamEvent};
pub use history::HistoryMerger;
pub use messages::{ensure_system_directive, reduce, strip_roles};
pub use selection::{select_models, select_models_with};
pub use stream::{StreamOrchestrator, StreamRequest, StreamSession};
