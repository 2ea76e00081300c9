use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::utils::RelayError;

/// Role of a provider-bound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MessageRole {
    type Error = RelayError;

    fn try_from(role: &str) -> Result<Self, Self::Error> {
        match role {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(RelayError::Validation(format!(
                "Unsupported message role: {}",
                other
            ))),
        }
    }
}

/// A message exactly as it leaves for the provider: role and content only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A message as sent by the browser client.
///
/// The role is free-form because the UI interleaves marker entries
/// (`separator`, `deepmind-progress`) with real turns, and arbitrary display
/// fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            extra: Map::new(),
        }
    }

    /// Drop every field except role and content
    pub fn to_chat_message(&self) -> Result<ChatMessage, RelayError> {
        Ok(ChatMessage {
            role: MessageRole::try_from(self.role.as_str())?,
            content: self.content.clone(),
        })
    }
}

impl From<ChatMessage> for ClientMessage {
    fn from(message: ChatMessage) -> Self {
        Self::new(message.role.as_str(), message.content)
    }
}

/// Reasoning hint accepted by some Groq models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[serde(rename = "none")]
    Disabled,
    Default,
    Low,
    Medium,
    High,
}

/// Invocation parameters for one registered model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registry key used by clients (e.g. "llama-3.3-70b")
    pub key: String,
    /// Human readable name
    pub name: String,
    /// Model identifier understood by the provider
    pub provider_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub top_p: f32,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl ModelConfig {
    /// Same model with different sampling settings
    pub fn with_sampling(&self, temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature,
            max_tokens,
            ..self.clone()
        }
    }
}

/// Response from a model
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// The full response text (accumulated when streaming)
    pub content: String,
    /// Usage statistics if available
    pub usage: Option<TokenUsage>,
    /// Provider model that generated the response
    pub model_name: String,
}

/// Token usage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Stream callback type for real-time response streaming
pub type StreamCallback = Arc<dyn Fn(&str) + Send + Sync>;
