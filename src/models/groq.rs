use anyhow::{Context as _, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::traits::ChatProvider;
use super::types::{ChatMessage, ModelConfig, ModelResponse, StreamCallback, TokenUsage};
use crate::app::ProviderConfig;

/// Chat provider speaking Groq's OpenAI-compatible completions API
pub struct GroqProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GroqProvider {
    /// Create a new provider instance
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Create a provider from configuration, reading the key from the environment
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key found in environment; provider calls will be unauthenticated"
            );
        }

        Self::new(
            &config.base_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn request_body(
        messages: &[ChatMessage],
        config: &ModelConfig,
        stream: bool,
    ) -> serde_json::Value {
        let mut body = json!({
            "model": config.provider_model,
            "messages": messages,
            "temperature": config.temperature,
            "max_completion_tokens": config.max_tokens,
            "top_p": config.top_p,
            "stream": stream,
        });

        if let Some(effort) = config.reasoning_effort {
            body["reasoning_effort"] = json!(effort);
        }

        body
    }

    async fn send(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = self.client.post(&url).json(body);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach completion provider at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Provider returned {}: {}", status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for GroqProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
        stream_callback: Option<StreamCallback>,
    ) -> Result<ModelResponse> {
        let body = Self::request_body(messages, config, stream_callback.is_some());
        tracing::debug!(
            model = %config.provider_model,
            messages = messages.len(),
            stream = stream_callback.is_some(),
            "Sending chat completion request"
        );

        let response = self.send(&body).await?;

        if let Some(callback) = stream_callback {
            let mut stream = response.bytes_stream().eventsource();
            let mut full_response = String::new();

            while let Some(event) = stream.next().await {
                let event = event.context("Provider stream interrupted")?;
                if event.data == "[DONE]" {
                    break;
                }

                let chunk: StreamChunk = serde_json::from_str(&event.data)
                    .with_context(|| format!("Malformed stream chunk: {}", event.data))?;

                if let Some(error) = chunk.error {
                    anyhow::bail!("Provider stream error: {}", error.message);
                }

                if let Some(delta) = chunk
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                {
                    if !delta.is_empty() {
                        full_response.push_str(delta);
                        callback(delta);
                    }
                }
            }

            Ok(ModelResponse {
                content: full_response,
                usage: None, // Usage stats not available in streaming
                model_name: config.provider_model.clone(),
            })
        } else {
            let response_json: ChatCompletionResponse = response
                .json()
                .await
                .context("Malformed completion response")?;

            let choice = response_json
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("Provider returned no choices"))?;

            Ok(ModelResponse {
                content: choice.message.content.unwrap_or_default(),
                usage: response_json.usage.map(|u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                }),
                model_name: config.provider_model.clone(),
            })
        }
    }
}

// Response structures (OpenAI format)

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
