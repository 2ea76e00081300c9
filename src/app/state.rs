use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::app::Config;
use crate::models::{ChatProvider, GroqProvider, ModelRegistry};
use crate::runtime::{ConsensusOrchestrator, HistoryMerger, StreamOrchestrator};
use crate::session::{ContextStore, SessionStore, Summarizer};

/// Global application state shared by every request handler
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Models clients may address
    pub registry: Arc<ModelRegistry>,
    /// Saved per-user conversations
    pub contexts: Arc<ContextStore>,
    /// Single-model streams
    pub streams: Arc<StreamOrchestrator>,
    /// DeepMind consensus runs
    pub consensus: Arc<ConsensusOrchestrator>,
}

impl AppState {
    /// Wire the stores and orchestrators around `provider`
    pub fn new(config: Config, provider: Arc<dyn ChatProvider>, registry: ModelRegistry) -> Self {
        let registry = Arc::new(registry);
        let contexts = Arc::new(ContextStore::new());
        let history = Arc::new(HistoryMerger::new(
            Arc::clone(&contexts),
            Summarizer::new(Arc::clone(&provider), Arc::clone(&registry)),
        ));
        let ttl = Duration::from_secs(config.sessions.ttl_secs);

        let streams = Arc::new(StreamOrchestrator::new(
            Arc::clone(&provider),
            Arc::clone(&registry),
            Arc::clone(&history),
            SessionStore::new(ttl),
        ));
        let consensus = Arc::new(ConsensusOrchestrator::new(
            provider,
            Arc::clone(&registry),
            history,
            SessionStore::new(ttl),
        ));

        Self {
            config,
            registry,
            contexts,
            streams,
            consensus,
        }
    }

    /// Production state backed by the Groq API
    pub fn from_config(config: Config) -> Result<Self> {
        let provider = Arc::new(GroqProvider::from_config(&config.provider)?);
        Ok(Self::new(config, provider, ModelRegistry::builtin()))
    }

    /// Drop prepared sessions nobody opened in time
    pub fn purge_expired_sessions(&self) -> usize {
        self.streams.purge_expired() + self.consensus.purge_expired()
    }
}
