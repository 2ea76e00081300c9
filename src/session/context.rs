use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

use crate::constants::CONTEXT_WARNING_THRESHOLD;
use crate::models::ClientMessage;
use crate::utils::{estimate_message_tokens, RelayError};

/// A user's saved conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContext {
    pub messages: Vec<ClientMessage>,
    pub token_count: usize,
    /// `None` only for the empty default of an unknown user
    pub last_updated: Option<DateTime<Utc>>,
}

impl StoredContext {
    pub fn needs_summarization(&self) -> bool {
        self.token_count > CONTEXT_WARNING_THRESHOLD
    }
}

/// Result of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub token_count: usize,
    pub needs_summarization: bool,
}

/// Per-user conversation history, kept for the life of the process
#[derive(Default)]
pub struct ContextStore {
    contexts: RwLock<HashMap<String, StoredContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored history for `user_id`.
    ///
    /// Both arguments are required; an empty user id counts as missing.
    pub fn save(
        &self,
        user_id: Option<&str>,
        messages: Option<Vec<ClientMessage>>,
    ) -> Result<SaveOutcome, RelayError> {
        let (user_id, messages) = match (user_id.filter(|id| !id.is_empty()), messages) {
            (Some(user_id), Some(messages)) => (user_id, messages),
            _ => {
                return Err(RelayError::Validation(
                    "userId and messages are required".to_string(),
                ))
            }
        };

        let context = StoredContext {
            token_count: estimate_message_tokens(&messages),
            messages,
            last_updated: Some(Utc::now()),
        };
        let outcome = SaveOutcome {
            token_count: context.token_count,
            needs_summarization: context.needs_summarization(),
        };

        tracing::debug!(
            user_id,
            messages = context.messages.len(),
            tokens = outcome.token_count,
            "Saved conversation context"
        );
        self.contexts.write().insert(user_id.to_string(), context);

        Ok(outcome)
    }

    /// Stored context, or the empty default when nothing is saved
    pub fn get(&self, user_id: &str) -> StoredContext {
        self.lookup(user_id).unwrap_or_default()
    }

    /// Stored context only if one exists
    pub fn lookup(&self, user_id: &str) -> Option<StoredContext> {
        self.contexts.read().get(user_id).cloned()
    }

    pub fn delete(&self, user_id: &str) {
        if self.contexts.write().remove(user_id).is_some() {
            tracing::debug!(user_id, "Deleted conversation context");
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user(content: &str) -> ClientMessage {
        ClientMessage::new("user", content)
    }

    #[test]
    fn test_save_and_get() {
        let store = ContextStore::new();
        let outcome = store.save(Some("u1"), Some(vec![user("hi")])).unwrap();

        assert_eq!(
            outcome,
            SaveOutcome {
                token_count: 1,
                needs_summarization: false
            }
        );

        let stored = store.get("u1");
        assert_eq!(stored.messages, vec![user("hi")]);
        assert_eq!(stored.token_count, 1);
        assert!(stored.last_updated.is_some());
    }

    #[test]
    fn test_save_requires_both_fields() {
        let store = ContextStore::new();
        assert!(matches!(
            store.save(None, Some(vec![])),
            Err(RelayError::Validation(_))
        ));
        assert!(matches!(
            store.save(Some("u1"), None),
            Err(RelayError::Validation(_))
        ));
        assert!(matches!(
            store.save(Some(""), Some(vec![])),
            Err(RelayError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_replaces_previous() {
        let store = ContextStore::new();
        store
            .save(Some("u1"), Some(vec![user("first"), user("second")]))
            .unwrap();
        store.save(Some("u1"), Some(vec![user("third")])).unwrap();

        let stored = store.get("u1");
        assert_eq!(stored.messages, vec![user("third")]);
        assert_eq!(stored.token_count, 2);
    }

    #[test]
    fn test_threshold_is_strictly_greater() {
        let store = ContextStore::new();
        let at = store
            .save(Some("a"), Some(vec![user(&"x".repeat(12_000))]))
            .unwrap();
        assert_eq!(at.token_count, 3000);
        assert!(!at.needs_summarization);

        let over = store
            .save(Some("b"), Some(vec![user(&"x".repeat(12_001))]))
            .unwrap();
        assert_eq!(over.token_count, 3001);
        assert!(over.needs_summarization);
    }

    #[test]
    fn test_unknown_user_gets_empty_default() {
        let store = ContextStore::new();
        let stored = store.get("nobody");
        assert!(stored.messages.is_empty());
        assert_eq!(stored.token_count, 0);
        assert!(stored.last_updated.is_none());
        assert!(store.lookup("nobody").is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = ContextStore::new();
        store.save(Some("u1"), Some(vec![user("hi")])).unwrap();
        store.delete("u1");
        store.delete("u1");
        assert_eq!(store.get("u1"), StoredContext::default());
    }
}
