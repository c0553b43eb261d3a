//! Parla AI - model provider access for the chat route
//!
//! This crate provides:
//! - Provider-neutral LLM client trait with streaming completions
//! - Google Gemini client
//! - Model registry built once at startup
//! - Conversion from UI messages to provider messages
//! - Relay from provider chunks to the UI message stream protocol

pub mod convert;
pub mod error;
pub mod failure;
mod http_client;
pub mod llm;
pub mod relay;

// Re-export commonly used types
pub use convert::convert_to_model_messages;
pub use error::{AiError, Result};
pub use failure::FailureReason;
pub use llm::{
    ChatMessage, CompletionRequest, ContentPart, FinishReason, GeminiClient, LlmClient,
    LlmProvider, ModelRegistry, ModelSpec, ProviderSettings, Role, Source, StreamChunk,
    StreamResult,
};
pub use relay::UiStreamRelay;
