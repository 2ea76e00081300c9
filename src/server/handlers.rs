use axum::{
    extract::{FromRequest, Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use crate::app::AppState;
use crate::constants::SSE_KEEP_ALIVE_SECS;
use crate::models::ClientMessage;
use crate::runtime::{ConsensusRequest, ConsensusSession, StreamRequest};
use crate::session::StoredContext;
use crate::utils::RelayError;

type Result<T> = std::result::Result<T, RelayError>;

/// JSON request body whose rejections answer with the `RelayError` body
#[derive(FromRequest)]
#[from_request(via(Json), rejection(RelayError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub models: usize,
    pub stream_sessions: usize,
    pub consensus_sessions: usize,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        models: state.registry.len(),
        stream_sessions: state.streams.pending(),
        consensus_sessions: state.consensus.pending(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContextRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ClientMessage>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContextResponse {
    pub success: bool,
    pub token_count: usize,
    pub needs_summarization: bool,
}

/// POST /context/save
pub async fn save_context(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<SaveContextRequest>,
) -> Result<Json<SaveContextResponse>> {
    let outcome = state
        .contexts
        .save(request.user_id.as_deref(), request.messages)?;

    Ok(Json(SaveContextResponse {
        success: true,
        token_count: outcome.token_count,
        needs_summarization: outcome.needs_summarization,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    #[serde(flatten)]
    pub context: StoredContext,
    pub needs_summarization: bool,
}

/// GET /context/{user_id}
pub async fn get_context(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<ContextResponse> {
    let context = state.contexts.get(&user_id);
    Json(ContextResponse {
        needs_summarization: context.needs_summarization(),
        context,
    })
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// DELETE /context/{user_id}
pub async fn delete_context(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<SuccessResponse> {
    state.contexts.delete(&user_id);
    Json(SuccessResponse { success: true })
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// GET /models
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let models = state
        .registry
        .models()
        .iter()
        .map(|m| ModelInfo {
            id: m.key.clone(),
            name: m.name.clone(),
            model: m.provider_model.clone(),
        })
        .collect();

    Json(ModelsResponse { models })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareStreamResponse {
    pub stream_id: String,
}

/// POST /prepare-stream
pub async fn prepare_stream(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<StreamRequest>,
) -> Result<Json<PrepareStreamResponse>> {
    let stream_id = state.streams.prepare(request).await?;
    Ok(Json(PrepareStreamResponse { stream_id }))
}

/// GET /stream/{stream_id}
///
/// Unknown ids fail with a 404 body before any event-stream headers go out.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let session = state.streams.open(&stream_id)?;
    tracing::info!(%stream_id, "Opening stream");
    Ok(event_stream(state.streams.start(session)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareConsensusResponse {
    pub session_id: String,
    pub session: ConsensusSession,
}

/// POST /deepmind/prepare
pub async fn prepare_consensus(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<ConsensusRequest>,
) -> Result<Json<PrepareConsensusResponse>> {
    let (session_id, session) = state.consensus.prepare(request).await?;
    Ok(Json(PrepareConsensusResponse {
        session_id,
        session,
    }))
}

/// GET /deepmind/stream/{session_id}
pub async fn consensus_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let session = state.consensus.open(&session_id)?;
    tracing::info!(%session_id, "Opening consensus stream");
    Ok(event_stream(state.consensus.start(session)))
}

/// Frame each event as `data: <json>`
fn event_stream<E>(
    rx: UnboundedReceiver<E>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>
where
    E: Serialize + Send + 'static,
{
    let stream = UnboundedReceiverStream::new(rx).map(|event| Event::default().json_data(&event));
    let keep_alive = KeepAlive::new().interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS));
    Sse::new(stream).keep_alive(keep_alive)
}
