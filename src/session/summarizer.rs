use std::sync::Arc;

use crate::constants::{SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE};
use crate::models::{ChatMessage, ChatProvider, ClientMessage, ModelRegistry};

const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation concisely. \
Preserve key facts, decisions, user preferences and any open questions so the \
conversation can continue from the summary alone.";

/// Collapses a long history into one summary string
pub struct Summarizer {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ModelRegistry>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn ChatProvider>, registry: Arc<ModelRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Summarize `messages` with `model_key` (baseline when absent).
    ///
    /// Never fails: provider errors are logged and yield an empty string,
    /// which callers treat as "no summary".
    pub async fn summarize(&self, messages: &[ClientMessage], model_key: Option<&str>) -> String {
        let config = self
            .registry
            .resolve(model_key)
            .with_sampling(SUMMARY_TEMPERATURE, SUMMARY_MAX_TOKENS);

        let request = [
            ChatMessage::system(SUMMARY_INSTRUCTION),
            ChatMessage::user(transcript(messages)),
        ];

        match self.provider.chat(&request, &config, None).await {
            Ok(response) => {
                let summary = response.content.trim().to_string();
                tracing::info!(
                    model = %config.key,
                    messages = messages.len(),
                    summary_len = summary.len(),
                    "Summarized conversation context"
                );
                summary
            }
            Err(e) => {
                tracing::warn!(model = %config.key, error = %e, "Context summarization failed");
                String::new()
            }
        }
    }
}

/// One `role: content` line per message
fn transcript(messages: &[ClientMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MockChatProvider, ModelResponse};

    fn history() -> Vec<ClientMessage> {
        vec![
            ClientMessage::new("user", "My name is Ada."),
            ClientMessage::new("assistant", "Nice to meet you, Ada."),
        ]
    }

    #[test]
    fn test_transcript_format() {
        assert_eq!(
            transcript(&history()),
            "user: My name is Ada.\nassistant: Nice to meet you, Ada."
        );
    }

    #[tokio::test]
    async fn test_summary_uses_low_temperature_and_cap() {
        let mut provider = MockChatProvider::new();
        provider
            .expect_chat()
            .withf(|messages, config, callback| {
                config.key == "llama-3.3-70b"
                    && config.temperature == SUMMARY_TEMPERATURE
                    && config.max_tokens == SUMMARY_MAX_TOKENS
                    && callback.is_none()
                    && messages[1].content.contains("user: My name is Ada.")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(ModelResponse {
                    content: "  The user is Ada.  ".to_string(),
                    ..Default::default()
                })
            });

        let summarizer = Summarizer::new(Arc::new(provider), Arc::new(ModelRegistry::builtin()));
        assert_eq!(summarizer.summarize(&history(), None).await, "The user is Ada.");
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty_summary() {
        let mut provider = MockChatProvider::new();
        provider
            .expect_chat()
            .returning(|_, _, _| Err(anyhow::anyhow!("503 upstream unavailable")));

        let summarizer = Summarizer::new(Arc::new(provider), Arc::new(ModelRegistry::builtin()));
        assert_eq!(summarizer.summarize(&history(), Some("gemma2-9b")).await, "");
    }
}
