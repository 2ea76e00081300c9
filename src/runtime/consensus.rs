use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::events::{unless_disconnected, ConsensusEvent};
use super::history::HistoryMerger;
use super::messages::{ensure_system_directive, reduce, strip_roles};
use super::selection::select_models;
use crate::constants::{
    CONSENSUS_PHASE_WIDTH, DEEPMIND_PROGRESS_ROLE, LATEX_SYSTEM_DIRECTIVE_SHORT, SEPARATOR_ROLE,
};
use crate::models::{
    ChatMessage, ChatProvider, ClientMessage, ModelConfig, ModelRegistry, ModelResponse,
    StreamCallback,
};
use crate::session::SessionStore;
use crate::utils::RelayError;

/// Body of `POST /deepmind/prepare`: a single `message` or a full `messages` list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ClientMessage>>,
}

impl ConsensusRequest {
    fn incoming(&mut self) -> Result<Vec<ClientMessage>, RelayError> {
        if let Some(messages) = self.messages.take() {
            return Ok(messages);
        }
        match self.message.take() {
            Some(message) => Ok(vec![ClientMessage::new("user", message)]),
            None => Err(RelayError::Validation(
                "message or messages is required".to_string(),
            )),
        }
    }
}

/// One model's answer within a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseResponse {
    pub model: String,
    pub response: String,
}

/// Progress of one consensus run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusSession {
    pub messages: Vec<ChatMessage>,
    pub phase: u8,
    pub phase1_models: Vec<String>,
    pub phase1_responses: Vec<PhaseResponse>,
    pub phase2_models: Vec<String>,
    pub phase2_responses: Vec<PhaseResponse>,
    pub final_response: String,
}

impl ConsensusSession {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }
}

enum RunError {
    Disconnected,
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for RunError {
    fn from(e: anyhow::Error) -> Self {
        RunError::Failed(e)
    }
}

/// Three-phase multi-model answer ("DeepMind" mode).
///
/// Phase 1 asks up to three random models independently. Phase 2 asks up to
/// three different models to critique the phase-1 answers. Phase 3 streams a
/// final answer from the baseline model built on the phase-2 analyses.
pub struct ConsensusOrchestrator {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ModelRegistry>,
    history: Arc<HistoryMerger>,
    sessions: SessionStore<ConsensusSession>,
}

impl ConsensusOrchestrator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        registry: Arc<ModelRegistry>,
        history: Arc<HistoryMerger>,
        sessions: SessionStore<ConsensusSession>,
    ) -> Self {
        Self {
            provider,
            registry,
            history,
            sessions,
        }
    }

    /// Normalize, merge and reduce the request into a fresh phase-0 session
    pub async fn prepare(
        &self,
        mut request: ConsensusRequest,
    ) -> Result<(String, ConsensusSession), RelayError> {
        let incoming = request.incoming()?;
        let merged = self.history.merge(request.user_id.as_deref(), incoming).await;
        let stripped = strip_roles(merged, &[SEPARATOR_ROLE, DEEPMIND_PROGRESS_ROLE]);
        let session = ConsensusSession::new(reduce(&stripped)?);

        let token = self.sessions.insert(session.clone());
        tracing::debug!(
            session_id = %token,
            messages = session.messages.len(),
            "Prepared consensus session"
        );
        Ok((token, session))
    }

    pub fn open(&self, token: &str) -> Result<ConsensusSession, RelayError> {
        self.sessions
            .take(token)
            .ok_or_else(|| RelayError::NotFound("Session not found".to_string()))
    }

    /// Run `session` on a background task and return its event stream
    pub fn start(self: &Arc<Self>, session: ConsensusSession) -> UnboundedReceiver<ConsensusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run(session, tx).await;
        });
        rx
    }

    /// Drive all three phases, ending with exactly one `done` or `error`.
    ///
    /// Returns the session as it stood when the run stopped.
    pub async fn run(
        &self,
        mut session: ConsensusSession,
        sink: UnboundedSender<ConsensusEvent>,
    ) -> ConsensusSession {
        match self.run_phases(&mut session, &sink).await {
            Ok(()) => {
                tracing::info!(
                    phase1 = ?session.phase1_models,
                    phase2 = ?session.phase2_models,
                    "Consensus complete"
                );
                let _ = sink.send(ConsensusEvent::Done { done: true });
            }
            Err(RunError::Failed(e)) => {
                tracing::warn!(phase = session.phase, error = %e, "Consensus failed");
                let _ = sink.send(ConsensusEvent::Error {
                    error: format!("{:#}", e),
                });
            }
            Err(RunError::Disconnected) => {
                tracing::debug!(phase = session.phase, "Client disconnected, consensus cancelled");
            }
        }
        session
    }

    async fn run_phases(
        &self,
        session: &mut ConsensusSession,
        sink: &UnboundedSender<ConsensusEvent>,
    ) -> Result<(), RunError> {
        ensure_system_directive(&mut session.messages, LATEX_SYSTEM_DIRECTIVE_SHORT);

        // Phase 1: independent answers
        let phase1 = select_models(&self.registry, CONSENSUS_PHASE_WIDTH, &[]);
        session.phase = 1;
        session.phase1_models = keys(&phase1);
        emit(sink, ConsensusEvent::Phase {
            phase: 1,
            models: session.phase1_models.clone(),
        });

        for config in phase1 {
            let response = self.call(sink, &session.messages, config, 1, None).await?;
            session.phase1_responses.push(PhaseResponse {
                model: config.key.clone(),
                response: response.content.clone(),
            });
            emit(sink, ConsensusEvent::Phase1Complete {
                model: config.key.clone(),
                response: response.content,
            });
        }

        // Phase 2: critique by models not used in phase 1
        let phase2 = select_models(&self.registry, CONSENSUS_PHASE_WIDTH, &session.phase1_models);
        session.phase = 2;
        session.phase2_models = keys(&phase2);
        emit(sink, ConsensusEvent::Phase {
            phase: 2,
            models: session.phase2_models.clone(),
        });

        let mut critique_messages = session.messages.clone();
        critique_messages.push(critique_prompt(&session.phase1_responses));

        for config in phase2 {
            let response = self.call(sink, &critique_messages, config, 2, None).await?;
            session.phase2_responses.push(PhaseResponse {
                model: config.key.clone(),
                response: response.content.clone(),
            });
            emit(sink, ConsensusEvent::Phase2Complete {
                model: config.key.clone(),
                response: response.content,
            });
        }

        // Phase 3: streamed synthesis by the baseline model
        let baseline = self.registry.baseline();
        session.phase = 3;
        emit(sink, ConsensusEvent::Phase {
            phase: 3,
            models: vec![baseline.key.clone()],
        });

        let mut synthesis_messages = session.messages.clone();
        synthesis_messages.push(synthesis_prompt(&session.phase2_responses));

        let fragments = sink.clone();
        let callback: StreamCallback = Arc::new(move |fragment: &str| {
            let _ = fragments.send(ConsensusEvent::Content {
                content: fragment.to_string(),
            });
        });

        let response = self
            .call(sink, &synthesis_messages, baseline, 3, Some(callback))
            .await?;
        session.final_response = response.content;

        Ok(())
    }

    async fn call(
        &self,
        sink: &UnboundedSender<ConsensusEvent>,
        messages: &[ChatMessage],
        config: &ModelConfig,
        phase: u8,
        callback: Option<StreamCallback>,
    ) -> Result<ModelResponse, RunError> {
        tracing::debug!(model = %config.key, phase, "Calling consensus model");
        let call = self.provider.chat(messages, config, callback);
        let result = unless_disconnected(sink, call)
            .await
            .ok_or(RunError::Disconnected)?;
        let response = result
            .with_context(|| format!("Model {} failed in phase {}", config.key, phase))
            .map_err(RunError::Failed)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %response.model_name,
                phase,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Consensus model usage"
            );
        }
        Ok(response)
    }

    pub fn pending(&self) -> usize {
        self.sessions.len()
    }

    pub fn purge_expired(&self) -> usize {
        self.sessions.purge_expired()
    }
}

fn emit(sink: &UnboundedSender<ConsensusEvent>, event: ConsensusEvent) {
    let _ = sink.send(event);
}

fn keys(models: &[&ModelConfig]) -> Vec<String> {
    models.iter().map(|m| m.key.clone()).collect()
}

fn critique_prompt(responses: &[PhaseResponse]) -> ChatMessage {
    let mut content = String::from(
        "Several models answered the conversation above independently. Their responses follow.\n\n",
    );
    for (i, r) in responses.iter().enumerate() {
        content.push_str(&format!("Response {}:\n{}\n\n", i + 1, r.response));
    }
    content.push_str(
        "Critically analyze these responses. Point out errors, gaps and points of agreement, \
then give your own improved answer.",
    );
    ChatMessage::assistant(content)
}

fn synthesis_prompt(analyses: &[PhaseResponse]) -> ChatMessage {
    let mut content =
        String::from("Independent analyses of candidate answers to the conversation above:\n\n");
    for (i, a) in analyses.iter().enumerate() {
        content.push_str(&format!("Analysis {}:\n{}\n\n", i + 1, a.response));
    }
    content.push_str(
        "Using these analyses, write one final comprehensive answer to the user's last message.",
    );
    ChatMessage::assistant(content)
}
