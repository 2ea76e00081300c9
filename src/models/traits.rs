use anyhow::Result;
use async_trait::async_trait;

use super::types::{ChatMessage, ModelConfig, ModelResponse, StreamCallback};

/// Core trait that all completion backends must implement
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat conversation to the model and get a response.
    ///
    /// With a callback the provider streams: every content fragment is handed
    /// to the callback in arrival order and the returned response carries the
    /// accumulated text.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
        stream_callback: Option<StreamCallback>,
    ) -> Result<ModelResponse>;
}
