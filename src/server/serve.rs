use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;

use super::routes::create_router;
use crate::app::{AppState, Config};
use crate::utils::RelayError;

/// The chat relay HTTP server
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    /// Create a server talking to the Groq API
    pub fn new(config: Config) -> Result<Self, RelayError> {
        let state =
            AppState::from_config(config).map_err(|e| RelayError::Config(format!("{e:#}")))?;
        Ok(Self::with_state(Arc::new(state)))
    }

    /// Create a server from an existing state
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<(), RelayError> {
        let addr = self.state.config.server.addr();
        let router = create_router(Arc::clone(&self.state));

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Server(format!("Failed to bind to {addr}: {e}")))?;

        let sweeper = spawn_session_sweeper(Arc::clone(&self.state));
        tracing::info!(
            %addr,
            models = self.state.registry.len(),
            "Chat relay listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RelayError::Server(format!("Server error: {e}")))?;

        sweeper.abort();
        tracing::info!("Chat relay stopped");
        Ok(())
    }
}

/// Periodically evict sessions that were prepared but never opened
fn spawn_session_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sessions.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = state.purge_expired_sessions();
            if purged > 0 {
                tracing::debug!(purged, "Evicted expired sessions");
            }
        }
    })
}

/// Signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        },
    }
}
