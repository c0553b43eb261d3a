//! Error types for the AI module

use serde_json::Value;
use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} API error ({status}): {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(String),

    /// Structured provider failure without a usable message
    #[error("Provider error: {0}")]
    Payload(Value),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
