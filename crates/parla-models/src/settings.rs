//! Generation settings and the `/api/chat` request body

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::message::UiMessage;

/// Model identifiers offered to the user
pub const SUPPORTED_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-pro"];

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 10_000;
pub const MAX_OUTPUT_TOKENS_RANGE: RangeInclusive<u32> = 1_000..=20_000;
pub const DEFAULT_CLIENT_SYSTEM_PROMPT: &str = "Sei un assistente AI che risponde in Italiano.";

const TEMPERATURE_STEP: f32 = 0.05;
const MAX_OUTPUT_TOKENS_STEP: u32 = 100;

/// Per-request settings chosen in the client sidebar
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    temperature: f32,
    max_output_tokens: u32,
    model: String,
    pub system_prompt: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_CLIENT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl GenerationSettings {
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Set temperature, clamped to 0.0..=1.0 and snapped to 0.05 steps
    pub fn set_temperature(&mut self, temperature: f32) {
        let clamped = if temperature.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            temperature.clamp(0.0, 1.0)
        };
        let steps = (clamped / TEMPERATURE_STEP).round();
        // Round to two decimals so 0.7 stays 0.7 on the wire
        self.temperature = ((steps * TEMPERATURE_STEP) * 100.0).round() / 100.0;
    }

    /// Set max output tokens, clamped to the slider range and snapped to 100s
    pub fn set_max_output_tokens(&mut self, tokens: u32) {
        let clamped = tokens.clamp(*MAX_OUTPUT_TOKENS_RANGE.start(), *MAX_OUTPUT_TOKENS_RANGE.end());
        let snapped = ((clamped + MAX_OUTPUT_TOKENS_STEP / 2) / MAX_OUTPUT_TOKENS_STEP)
            * MAX_OUTPUT_TOKENS_STEP;
        self.max_output_tokens = snapped.min(*MAX_OUTPUT_TOKENS_RANGE.end());
    }

    /// Select a model; returns false if the identifier is not offered
    pub fn set_model(&mut self, model: &str) -> bool {
        let model = model.trim();
        if SUPPORTED_MODELS.contains(&model) {
            self.model = model.to_string();
            true
        } else {
            false
        }
    }
}

/// Body of `POST /api/chat`
///
/// Every field except `messages` may be absent; the server fills in
/// provider defaults and the configured system prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub id: String,
    pub messages: Vec<UiMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn new(
        id: impl Into<String>,
        messages: Vec<UiMessage>,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            id: id.into(),
            messages,
            temperature: Some(settings.temperature()),
            max_output_tokens: Some(settings.max_output_tokens()),
            model: settings.model().to_string(),
            system_prompt: Some(settings.system_prompt.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_temperature_is_clamped_and_snapped() {
        let mut settings = GenerationSettings::default();
        settings.set_temperature(1.7);
        assert_eq!(settings.temperature(), 1.0);
        settings.set_temperature(-0.2);
        assert_eq!(settings.temperature(), 0.0);
        settings.set_temperature(0.33);
        assert_eq!(settings.temperature(), 0.35);
    }

    #[test]
    fn test_max_output_tokens_is_clamped_and_snapped() {
        let mut settings = GenerationSettings::default();
        settings.set_max_output_tokens(50);
        assert_eq!(settings.max_output_tokens(), 1_000);
        settings.set_max_output_tokens(99_999);
        assert_eq!(settings.max_output_tokens(), 20_000);
        settings.set_max_output_tokens(12_345);
        assert_eq!(settings.max_output_tokens(), 12_300);
    }

    #[test]
    fn test_set_model_rejects_unknown_identifier() {
        let mut settings = GenerationSettings::default();
        assert!(settings.set_model("gemini-2.5-pro"));
        assert_eq!(settings.model(), "gemini-2.5-pro");
        assert!(!settings.set_model("gpt-4o"));
        assert_eq!(settings.model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_request_body_uses_camel_case() {
        let request = ChatRequest::new("chat-1", vec![], &GenerationSettings::default());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["maxOutputTokens"], 10_000);
        assert_eq!(value["model"], "gemini-2.5-flash");
        assert_eq!(value["systemPrompt"], DEFAULT_CLIENT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_request_tolerates_missing_settings() {
        let request: ChatRequest = serde_json::from_value(json!({
            "id": "chat-1",
            "messages": [],
            "trigger": "submit-message"
        }))
        .unwrap();
        assert_eq!(request.temperature, None);
        assert_eq!(request.system_prompt, None);
        assert!(request.model.is_empty());
    }
}
