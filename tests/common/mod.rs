#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use chatrelay::models::{ChatMessage, ChatProvider, ModelConfig, ModelResponse, StreamCallback};
use chatrelay::{create_router, AppState, Config, ModelRegistry};

/// One provider invocation as observed by [`ScriptedProvider`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub streamed: bool,
    pub temperature: f32,
}

/// Deterministic stand-in for the Groq API.
///
/// Non-streaming calls answer `"<model key> answer"`; streaming calls emit the
/// configured fragments. Call number `fail_on` (1-based) fails instead.
pub struct ScriptedProvider {
    fragments: Vec<String>,
    fail_on: Option<usize>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            fragments: vec!["The answer".to_string(), " is 4.".to_string()],
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
        stream_callback: Option<StreamCallback>,
    ) -> Result<ModelResponse> {
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push(RecordedCall {
                model: config.key.clone(),
                messages: messages.to_vec(),
                streamed: stream_callback.is_some(),
                temperature: config.temperature,
            });
            calls.len()
        };

        if self.fail_on == Some(call_number) {
            anyhow::bail!("Provider returned 500 Internal Server Error: scripted failure");
        }

        let content = match stream_callback {
            Some(callback) => {
                for fragment in &self.fragments {
                    callback(fragment.as_str());
                }
                self.fragments.concat()
            }
            None => format!("{} answer", config.key),
        };

        Ok(ModelResponse {
            content,
            usage: None,
            model_name: config.provider_model.clone(),
        })
    }
}

/// Router plus handles for inspecting what happened behind it
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub provider: Arc<ScriptedProvider>,
}

impl TestApp {
    pub fn new(provider: ScriptedProvider) -> Self {
        Self::with_registry(provider, ModelRegistry::builtin())
    }

    pub fn with_registry(provider: ScriptedProvider, registry: ModelRegistry) -> Self {
        let provider = Arc::new(provider);
        let state = Arc::new(AppState::new(Config::default(), provider.clone(), registry));
        Self {
            router: create_router(Arc::clone(&state)),
            state,
            provider,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        self.post_json_text(uri, &body.to_string()).await
    }

    /// POST `body` verbatim, labelled as JSON
    pub async fn post_json_text(&self, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::post(uri).body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}

pub fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

/// Parse an event-stream body into its `data:` payloads
pub fn sse_events(bytes: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim_start()).unwrap())
        .collect()
}
