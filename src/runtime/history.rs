use std::sync::Arc;

use crate::constants::{CONTEXT_MAX_TOKENS, SUMMARY_PREFIX, SUMMARY_TAIL_MESSAGES};
use crate::models::ClientMessage;
use crate::session::{ContextStore, Summarizer};

/// Joins a request's messages with the user's stored conversation
pub struct HistoryMerger {
    contexts: Arc<ContextStore>,
    summarizer: Summarizer,
}

impl HistoryMerger {
    pub fn new(contexts: Arc<ContextStore>, summarizer: Summarizer) -> Self {
        Self {
            contexts,
            summarizer,
        }
    }

    /// Merge stored history for `user_id` in front of `incoming`.
    ///
    /// Without a user id or a stored context the incoming list is returned as
    /// is. A stored context over the token ceiling is summarized (at most once
    /// per call) and only the summary plus the last two incoming messages are
    /// kept; if summarization yields nothing, just those two messages remain.
    pub async fn merge(
        &self,
        user_id: Option<&str>,
        incoming: Vec<ClientMessage>,
    ) -> Vec<ClientMessage> {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return incoming;
        };
        let Some(stored) = self.contexts.lookup(user_id) else {
            return incoming;
        };

        if stored.token_count <= CONTEXT_MAX_TOKENS {
            let mut merged = stored.messages;
            merged.extend(incoming);
            return merged;
        }

        tracing::info!(
            user_id,
            tokens = stored.token_count,
            "Stored context over ceiling, summarizing"
        );

        let tail = tail(incoming, SUMMARY_TAIL_MESSAGES);
        let summary = self.summarizer.summarize(&stored.messages, None).await;
        if summary.is_empty() {
            return tail;
        }

        let mut merged = Vec::with_capacity(tail.len() + 1);
        merged.push(ClientMessage::new(
            "system",
            format!("{}{}", SUMMARY_PREFIX, summary),
        ));
        merged.extend(tail);
        merged
    }
}

fn tail(mut messages: Vec<ClientMessage>, count: usize) -> Vec<ClientMessage> {
    let start = messages.len().saturating_sub(count);
    messages.split_off(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MockChatProvider, ModelRegistry, ModelResponse};
    use pretty_assertions::assert_eq;

    fn merger(contexts: Arc<ContextStore>, provider: MockChatProvider) -> HistoryMerger {
        let summarizer = Summarizer::new(Arc::new(provider), Arc::new(ModelRegistry::builtin()));
        HistoryMerger::new(contexts, summarizer)
    }

    fn incoming() -> Vec<ClientMessage> {
        vec![
            ClientMessage::new("user", "one"),
            ClientMessage::new("assistant", "two"),
            ClientMessage::new("user", "three"),
        ]
    }

    fn summarizing_provider(summary: &'static str) -> MockChatProvider {
        let mut provider = MockChatProvider::new();
        provider.expect_chat().times(1).returning(move |_, _, _| {
            Ok(ModelResponse {
                content: summary.to_string(),
                ..Default::default()
            })
        });
        provider
    }

    #[tokio::test]
    async fn test_no_user_id_passes_through() {
        let contexts = Arc::new(ContextStore::new());
        let mut provider = MockChatProvider::new();
        provider.expect_chat().never();

        let merged = merger(contexts, provider).merge(None, incoming()).await;
        assert_eq!(merged, incoming());
    }

    #[tokio::test]
    async fn test_unknown_user_passes_through() {
        let contexts = Arc::new(ContextStore::new());
        let mut provider = MockChatProvider::new();
        provider.expect_chat().never();

        let merged = merger(contexts, provider).merge(Some("ghost"), incoming()).await;
        assert_eq!(merged, incoming());
    }

    #[tokio::test]
    async fn test_under_ceiling_concatenates() {
        let contexts = Arc::new(ContextStore::new());
        let stored = vec![ClientMessage::new("user", "earlier")];
        contexts.save(Some("u1"), Some(stored.clone())).unwrap();

        let mut provider = MockChatProvider::new();
        provider.expect_chat().never();

        let merged = merger(contexts, provider).merge(Some("u1"), incoming()).await;
        let mut expected = stored;
        expected.extend(incoming());
        assert_eq!(merged, expected);
    }

    #[tokio::test]
    async fn test_exactly_at_ceiling_concatenates() {
        let contexts = Arc::new(ContextStore::new());
        let stored = vec![ClientMessage::new("user", "x".repeat(16_000))];
        contexts.save(Some("u1"), Some(stored)).unwrap();

        let mut provider = MockChatProvider::new();
        provider.expect_chat().never();

        let merged = merger(contexts, provider).merge(Some("u1"), incoming()).await;
        assert_eq!(merged.len(), 4);
    }

    #[tokio::test]
    async fn test_over_ceiling_summarizes() {
        let contexts = Arc::new(ContextStore::new());
        contexts
            .save(
                Some("u1"),
                Some(vec![ClientMessage::new("user", "x".repeat(16_001))]),
            )
            .unwrap();

        let merged = merger(contexts, summarizing_provider("S"))
            .merge(Some("u1"), incoming())
            .await;

        assert_eq!(
            merged,
            vec![
                ClientMessage::new("system", "Previous conversation summary: S"),
                ClientMessage::new("assistant", "two"),
                ClientMessage::new("user", "three"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_summary_falls_back_to_tail() {
        let contexts = Arc::new(ContextStore::new());
        contexts
            .save(
                Some("u1"),
                Some(vec![ClientMessage::new("user", "x".repeat(20_000))]),
            )
            .unwrap();

        let mut provider = MockChatProvider::new();
        provider
            .expect_chat()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("timeout")));

        let merged = merger(contexts, provider).merge(Some("u1"), incoming()).await;
        assert_eq!(
            merged,
            vec![
                ClientMessage::new("assistant", "two"),
                ClientMessage::new("user", "three"),
            ]
        );
    }

    #[test]
    fn test_tail_of_short_list() {
        let one = vec![ClientMessage::new("user", "only")];
        assert_eq!(tail(one.clone(), 2), one);
        assert!(tail(Vec::new(), 2).is_empty());
    }
}
