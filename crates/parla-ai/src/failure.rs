//! Normalization of generation failures into client-facing text

use serde_json::Value;

use crate::error::AiError;

const UNKNOWN_ERROR: &str = "unknown error";

/// Anything that can abort a generation, before it is turned into the
/// `errorText` of a stream error event.
#[derive(Debug)]
pub enum FailureReason {
    /// No information about the failure
    Unknown,
    /// A bare message
    Message(String),
    /// An error value; its `Display` output is used
    Error(Box<dyn std::error::Error + Send + Sync>),
    /// Any other structured value; rendered as compact JSON
    Value(Value),
}

impl FailureReason {
    pub fn into_error_text(self) -> String {
        match self {
            Self::Unknown | Self::Value(Value::Null) => UNKNOWN_ERROR.to_string(),
            Self::Message(message) | Self::Value(Value::String(message)) => message,
            Self::Error(error) => error.to_string(),
            Self::Value(value) => value.to_string(),
        }
    }
}

impl From<AiError> for FailureReason {
    fn from(error: AiError) -> Self {
        match error {
            AiError::Payload(value) => Self::Value(value),
            other => Self::Error(Box::new(other)),
        }
    }
}

impl From<Option<AiError>> for FailureReason {
    fn from(error: Option<AiError>) -> Self {
        error.map(Self::from).unwrap_or(Self::Unknown)
    }
}
