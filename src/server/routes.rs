use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::app::AppState;

/// Creates the Axum router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    // The browser client is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = Router::new()
        .route("/save", post(handlers::save_context))
        .route(
            "/{user_id}",
            get(handlers::get_context).delete(handlers::delete_context),
        );

    let deepmind = Router::new()
        .route("/prepare", post(handlers::prepare_consensus))
        .route("/stream/{session_id}", get(handlers::consensus_stream));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::list_models))
        .route("/prepare-stream", post(handlers::prepare_stream))
        .route("/stream/{stream_id}", get(handlers::stream))
        .nest("/context", context)
        .nest("/deepmind", deepmind)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
