use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::events::{unless_disconnected, StreamEvent};
use super::history::HistoryMerger;
use super::messages::{ensure_system_directive, reduce, strip_roles};
use crate::constants::{LATEX_SYSTEM_DIRECTIVE, SEPARATOR_ROLE};
use crate::models::{ChatProvider, ClientMessage, ModelRegistry, StreamCallback};
use crate::session::SessionStore;
use crate::utils::RelayError;

/// Body of `POST /prepare-stream`; unknown fields are carried into the session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ClientMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A prepared single-model stream waiting to be opened
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSession {
    pub messages: Vec<ClientMessage>,
    pub model: Option<String>,
    pub user_id: Option<String>,
    pub extra: Map<String, Value>,
}

/// Prepares and runs single-model streaming sessions
pub struct StreamOrchestrator {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ModelRegistry>,
    history: Arc<HistoryMerger>,
    sessions: SessionStore<StreamSession>,
}

impl StreamOrchestrator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        registry: Arc<ModelRegistry>,
        history: Arc<HistoryMerger>,
        sessions: SessionStore<StreamSession>,
    ) -> Self {
        Self {
            provider,
            registry,
            history,
            sessions,
        }
    }

    /// Merge history into the request and park it under a fresh token
    pub async fn prepare(&self, request: StreamRequest) -> Result<String, RelayError> {
        let StreamRequest {
            user_id,
            messages,
            model,
            extra,
        } = request;
        let messages =
            messages.ok_or_else(|| RelayError::Validation("messages are required".to_string()))?;

        let merged = self.history.merge(user_id.as_deref(), messages).await;
        let token = self.sessions.insert(StreamSession {
            messages: merged,
            model,
            user_id,
            extra,
        });

        tracing::debug!(stream_id = %token, "Prepared stream session");
        Ok(token)
    }

    /// Claim a prepared session; it leaves the store immediately
    pub fn open(&self, token: &str) -> Result<StreamSession, RelayError> {
        self.sessions
            .take(token)
            .ok_or_else(|| RelayError::NotFound("Stream not found".to_string()))
    }

    /// Run `session` on a background task and return its event stream
    pub fn start(self: &Arc<Self>, session: StreamSession) -> UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(session, tx).await });
        rx
    }

    /// Stream one model's answer into `sink`.
    ///
    /// Emits content fragments in provider order followed by exactly one
    /// terminal event, unless the receiver is dropped first.
    pub async fn run(&self, session: StreamSession, sink: UnboundedSender<StreamEvent>) {
        let messages = strip_roles(session.messages, &[SEPARATOR_ROLE]);
        let mut messages = match reduce(&messages) {
            Ok(messages) => messages,
            Err(e) => {
                let _ = sink.send(StreamEvent::error(e.to_string()));
                return;
            }
        };
        ensure_system_directive(&mut messages, LATEX_SYSTEM_DIRECTIVE);

        let config = self.registry.resolve(session.model.as_deref());
        tracing::info!(
            model = %config.key,
            messages = messages.len(),
            "Streaming completion"
        );

        let fragments = sink.clone();
        let callback: StreamCallback = Arc::new(move |fragment: &str| {
            let _ = fragments.send(StreamEvent::content(fragment));
        });

        let call = self.provider.chat(&messages, config, Some(callback));
        match unless_disconnected(&sink, call).await {
            Some(Ok(response)) => {
                tracing::debug!(
                    model = %config.key,
                    provider_model = %response.model_name,
                    chars = response.content.len(),
                    total_tokens = response.usage.as_ref().map(|u| u.total_tokens),
                    "Stream complete"
                );
                let _ = sink.send(StreamEvent::done());
            }
            Some(Err(e)) => {
                tracing::warn!(model = %config.key, error = %e, "Stream failed");
                let _ = sink.send(StreamEvent::error(format!("{:#}", e)));
            }
            None => {
                tracing::debug!(model = %config.key, "Client disconnected, stream cancelled");
            }
        }
    }

    /// Sessions prepared but not yet opened
    pub fn pending(&self) -> usize {
        self.sessions.len()
    }

    pub fn purge_expired(&self) -> usize {
        self.sessions.purge_expired()
    }
}
