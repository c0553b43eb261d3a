//! LLM client trait and types

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;

pub use parla_models::TokenUsage;

/// Provider-side message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Where the bytes of a file part live
#[derive(Debug, Clone, PartialEq)]
pub enum FileData {
    /// Base64 payload, already decoded from a `data:` URL
    Base64(String),
    /// Remote reference the provider fetches itself
    Url(String),
}

/// One piece of provider message content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Reasoning(String),
    File { media_type: String, data: FileData },
}

/// Provider-side chat message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::Text(content.into())],
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::Text(content.into())],
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentPart::Text(content.into())],
        }
    }

    /// Concatenated text content, ignoring reasoning and files
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Reason for completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
    Other,
}

/// Citation surfaced by the provider (e.g. search grounding)
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub url: String,
    pub title: Option<String>,
}

/// File generated by the model, e.g. an image
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub media_type: String,
    pub base64: String,
}

impl GeneratedFile {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Incremental piece of a streamed completion.
///
/// A chunk carries at most one kind of content; the final chunk carries the
/// finish reason and accumulated usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    pub text: String,
    pub reasoning: Option<String>,
    pub source: Option<Source>,
    pub file: Option<GeneratedFile>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn source(source: Source) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn file(file: GeneratedFile) -> Self {
        Self {
            file: Some(file),
            ..Default::default()
        }
    }

    pub fn final_chunk(finish_reason: FinishReason, usage: Option<TokenUsage>) -> Self {
        Self {
            finish_reason: Some(finish_reason),
            usage,
            ..Default::default()
        }
    }
}

/// Boxed stream of completion chunks
pub type StreamResult = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// LLM completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Set the system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: Option<f32>) -> Self {
        self.temperature = temp;
        self
    }

    /// Set max output tokens
    pub fn with_max_output_tokens(mut self, tokens: Option<u32>) -> Self {
        self.max_output_tokens = tokens;
        self
    }
}

/// LLM client trait
pub trait LlmClient: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Stream a chat completion.
    ///
    /// Failures, including ones that happen before the first byte, are
    /// yielded as `Err` items rather than returned eagerly.
    fn complete_stream(&self, request: CompletionRequest) -> StreamResult;
}
