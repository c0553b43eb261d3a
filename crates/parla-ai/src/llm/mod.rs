//! LLM module - provider client abstraction

mod client;
mod gemini;
#[cfg(any(test, feature = "test-utils"))]
mod mock_client;
mod registry;

pub use client::{
    ChatMessage, CompletionRequest, ContentPart, FileData, FinishReason, GeneratedFile, LlmClient,
    Role, Source, StreamChunk, StreamResult, TokenUsage,
};
pub use gemini::GeminiClient;
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockStep};
pub use registry::{LlmProvider, ModelRegistry, ModelSpec, ProviderSettings};
