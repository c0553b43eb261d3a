//! Deterministic mock LLM client for route and relay tests.

use std::sync::Arc;

use async_stream::stream;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::AiError;

use super::{
    CompletionRequest, FinishReason, GeneratedFile, LlmClient, Source, StreamChunk, StreamResult,
    TokenUsage,
};

/// Scripted stream item
#[derive(Debug, Clone)]
pub enum MockStep {
    Text(String),
    Reasoning(String),
    Source { url: String, title: Option<String> },
    File { media_type: String, base64: String },
    Finish(FinishReason, Option<TokenUsage>),
    /// Fail with a message error
    Error(String),
    /// Fail with a structured payload
    Payload(Value),
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn reasoning(content: impl Into<String>) -> Self {
        Self::Reasoning(content.into())
    }

    pub fn source(url: impl Into<String>, title: Option<&str>) -> Self {
        Self::Source {
            url: url.into(),
            title: title.map(str::to_string),
        }
    }

    pub fn finish(usage: TokenUsage) -> Self {
        Self::Finish(FinishReason::Stop, Some(usage))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// A mock client that replays the same script on every call and records
/// the requests it receives.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Vec<MockStep>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_steps(model, Vec::new())
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(steps),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn fallback_steps(request: &CompletionRequest) -> Vec<MockStep> {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == super::Role::User)
            .map(|msg| format!("mock-echo: {}", msg.text()))
            .unwrap_or_else(|| "mock-ok".to_string());
        let output_tokens = text.len() as u32;

        vec![
            MockStep::Text(text),
            MockStep::finish(TokenUsage {
                input_tokens: 1,
                output_tokens,
                total_tokens: 1 + output_tokens,
                reasoning_tokens: 0,
            }),
        ]
    }
}

impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let steps = if self.script.is_empty() {
            Self::fallback_steps(&request)
        } else {
            self.script.as_ref().clone()
        };
        self.requests.lock().push(request);

        Box::pin(stream! {
            for step in steps {
                match step {
                    MockStep::Text(text) => {
                        yield Ok(StreamChunk::text(text));
                    }
                    MockStep::Reasoning(text) => {
                        yield Ok(StreamChunk::reasoning(text));
                    }
                    MockStep::Source { url, title } => {
                        yield Ok(StreamChunk::source(Source { url, title }));
                    }
                    MockStep::File { media_type, base64 } => {
                        yield Ok(StreamChunk::file(GeneratedFile { media_type, base64 }));
                    }
                    MockStep::Finish(reason, usage) => {
                        yield Ok(StreamChunk::final_chunk(reason, usage));
                    }
                    MockStep::Error(message) => {
                        yield Err(AiError::Llm(message));
                        return;
                    }
                    MockStep::Payload(value) => {
                        yield Err(AiError::Payload(value));
                        return;
                    }
                }
            }
        })
    }
}
