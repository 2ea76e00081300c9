use anyhow::Result;

use super::types::{ModelConfig, ReasoningEffort};
use crate::constants::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};

/// Key of the model used when a request names none, and for final synthesis
pub const BASELINE_MODEL: &str = "llama-3.3-70b";

/// Ordered table of the models clients may address by key
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelConfig>,
    baseline: usize,
}

impl ModelRegistry {
    /// Build a registry; `baseline_key` must name one of `models`
    pub fn new(models: Vec<ModelConfig>, baseline_key: &str) -> Result<Self> {
        let baseline = models
            .iter()
            .position(|m| m.key == baseline_key)
            .ok_or_else(|| {
                anyhow::anyhow!("Baseline model '{}' is not registered", baseline_key)
            })?;

        Ok(Self { models, baseline })
    }

    /// The Groq models the service ships with
    pub fn builtin() -> Self {
        let models = vec![
            model("llama-3.3-70b", "Llama 3.3 70B Versatile", "llama-3.3-70b-versatile"),
            model("llama-3.1-8b", "Llama 3.1 8B Instant", "llama-3.1-8b-instant"),
            model(
                "llama-4-scout",
                "Llama 4 Scout 17B",
                "meta-llama/llama-4-scout-17b-16e-instruct",
            ),
            model(
                "llama-4-maverick",
                "Llama 4 Maverick 17B",
                "meta-llama/llama-4-maverick-17b-128e-instruct",
            ),
            ModelConfig {
                temperature: 0.6,
                top_p: 0.95,
                ..model(
                    "deepseek-r1-70b",
                    "DeepSeek R1 Distill Llama 70B",
                    "deepseek-r1-distill-llama-70b",
                )
            },
            ModelConfig {
                temperature: 0.6,
                top_p: 0.95,
                reasoning_effort: Some(ReasoningEffort::Default),
                ..model("qwen3-32b", "Qwen 3 32B", "qwen/qwen3-32b")
            },
            model("gemma2-9b", "Gemma 2 9B", "gemma2-9b-it"),
            ModelConfig {
                temperature: 1.0,
                max_tokens: 8192,
                reasoning_effort: Some(ReasoningEffort::Medium),
                ..model("gpt-oss-120b", "GPT-OSS 120B", "openai/gpt-oss-120b")
            },
        ];

        Self {
            models,
            baseline: 0,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.key == key)
    }

    /// Look up a model, falling back to the baseline for absent or unknown keys
    pub fn resolve(&self, key: Option<&str>) -> &ModelConfig {
        match key.and_then(|k| self.get(k)) {
            Some(config) => config,
            None => {
                if let Some(unknown) = key {
                    tracing::debug!(model = unknown, "Unknown model key, using baseline");
                }
                self.baseline()
            }
        }
    }

    pub fn baseline(&self) -> &ModelConfig {
        &self.models[self.baseline]
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn keys(&self) -> Vec<String> {
        self.models.iter().map(|m| m.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn model(key: &str, name: &str, provider_model: &str) -> ModelConfig {
    ModelConfig {
        key: key.to_string(),
        name: name.to_string(),
        provider_model: provider_model.to_string(),
        temperature: DEFAULT_TEMPERATURE,
        max_tokens: DEFAULT_MAX_TOKENS,
        top_p: DEFAULT_TOP_P,
        reasoning_effort: None,
    }
}
