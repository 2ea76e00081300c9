use serde::Serialize;
use std::future::Future;
use tokio::sync::mpsc::UnboundedSender;

/// Event pushed to a single-model stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Content { content: String },
    Done { done: bool },
    Error { error: String },
}

impl StreamEvent {
    pub fn content(fragment: impl Into<String>) -> Self {
        Self::Content {
            content: fragment.into(),
        }
    }

    pub fn done() -> Self {
        Self::Done { done: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }
}

/// Event pushed to a consensus stream, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsensusEvent {
    Phase {
        phase: u8,
        models: Vec<String>,
    },
    #[serde(rename = "phase1_complete")]
    Phase1Complete {
        model: String,
        response: String,
    },
    #[serde(rename = "phase2_complete")]
    Phase2Complete {
        model: String,
        response: String,
    },
    Content {
        content: String,
    },
    Done {
        done: bool,
    },
    Error {
        error: String,
    },
}

impl ConsensusEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Drive `fut` unless the receiving side of `sink` goes away first.
///
/// Returns `None` when the client disconnected; the future is dropped, which
/// aborts any in-flight provider request.
pub(crate) async fn unless_disconnected<T, F>(
    sink: &UnboundedSender<T>,
    fut: F,
) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = sink.closed() => None,
        output = fut => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_event_wire_format() {
        assert_eq!(
            serde_json::to_value(StreamEvent::content("Hel")).unwrap(),
            json!({"content": "Hel"})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::done()).unwrap(),
            json!({"done": true})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::error("boom")).unwrap(),
            json!({"error": "boom"})
        );
    }

    #[test]
    fn test_consensus_event_wire_format() {
        assert_eq!(
            serde_json::to_value(ConsensusEvent::Phase {
                phase: 1,
                models: vec!["a".into(), "b".into()]
            })
            .unwrap(),
            json!({"type": "phase", "phase": 1, "models": ["a", "b"]})
        );
        assert_eq!(
            serde_json::to_value(ConsensusEvent::Phase1Complete {
                model: "a".into(),
                response: "r".into()
            })
            .unwrap(),
            json!({"type": "phase1_complete", "model": "a", "response": "r"})
        );
        assert_eq!(
            serde_json::to_value(ConsensusEvent::Phase2Complete {
                model: "b".into(),
                response: String::new()
            })
            .unwrap(),
            json!({"type": "phase2_complete", "model": "b", "response": ""})
        );
        assert_eq!(
            serde_json::to_value(ConsensusEvent::Done { done: true }).unwrap(),
            json!({"type": "done", "done": true})
        );
    }

    #[tokio::test]
    async fn test_unless_disconnected() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        assert_eq!(unless_disconnected(&tx, async { 5 }).await, Some(5));

        drop(rx);
        let pending = std::future::pending::<u8>();
        assert_eq!(unless_disconnected(&tx, pending).await, None);
    }
}
