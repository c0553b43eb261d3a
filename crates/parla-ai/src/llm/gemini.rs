//! Google Gemini LLM provider

use std::collections::HashSet;

use futures::StreamExt;
use parla_models::SseDecoder;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, ContentPart, FileData, FinishReason, GeneratedFile, LlmClient, Role,
    Source, StreamChunk, StreamResult, TokenUsage,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER_LABEL: &str = "Google";

/// Gemini client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    include_thoughts: bool,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(false),
            api_key: api_key.into(),
            model: "gemini-2.5-flash".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            include_thoughts: true,
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Connect directly, ignoring `HTTP(S)_PROXY` from the environment
    pub fn without_system_proxy(mut self) -> Self {
        self.client = build_http_client(true);
        self
    }

    /// Ask the model to return thought summaries as reasoning
    pub fn with_include_thoughts(mut self, include: bool) -> Self {
        self.include_thoughts = include;
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_body(&self, request: &CompletionRequest) -> GeminiRequest {
        let mut system_texts: Vec<String> = request.system.iter().cloned().collect();
        let mut contents = Vec::new();

        for message in &request.messages {
            let role = match message.role {
                Role::System => {
                    system_texts.push(message.text());
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "model",
            };

            let parts: Vec<GeminiPart> = message.content.iter().map(GeminiPart::from).collect();
            if !parts.is_empty() {
                contents.push(GeminiContent { role, parts });
            }
        }

        let system_instruction = system_texts
            .into_iter()
            .filter(|text| !text.is_empty())
            .reduce(|acc, text| format!("{acc}\n\n{text}"))
            .map(|text| GeminiSystemInstruction {
                parts: vec![GeminiPart::text(text)],
            });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                thinking_config: self.include_thoughts.then_some(ThinkingConfig {
                    include_thoughts: true,
                }),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileDataRef>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }
}

impl From<&ContentPart> for GeminiPart {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => Self::text(text.clone()),
            ContentPart::Reasoning(text) => Self {
                text: Some(text.clone()),
                thought: Some(true),
                ..Default::default()
            },
            ContentPart::File {
                media_type,
                data: FileData::Base64(data),
            } => Self {
                inline_data: Some(InlineData {
                    mime_type: media_type.clone(),
                    data: data.clone(),
                }),
                ..Default::default()
            },
            ContentPart::File {
                media_type,
                data: FileData::Url(url),
            } => Self {
                file_data: Some(FileDataRef {
                    mime_type: media_type.clone(),
                    file_uri: url.clone(),
                }),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileDataRef {
    mime_type: String,
    file_uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    include_thoughts: bool,
}

// Streaming response types

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GeminiStreamResponse {
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ResponsePart {
    text: Option<String>,
    thought: Option<bool>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "camelCase", default)]
struct UsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: u32,
    thoughts_token_count: u32,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(usage: UsageMetadata) -> Self {
        TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
            reasoning_tokens: usage.thoughts_token_count,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII"
        | "IMAGE_SAFETY" => FinishReason::ContentFilter,
        "MALFORMED_FUNCTION_CALL" => FinishReason::Error,
        _ => FinishReason::Other,
    }
}

/// Turn a non-success response body into an error.
///
/// Google wraps failures as `{"error": {"message": ...}}`; bodies without a
/// message are kept as structured payloads.
fn http_error(status: u16, body: &str) -> AiError {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let detail = value.get("error").cloned().unwrap_or(value);
            match detail.get("message").and_then(Value::as_str) {
                Some(message) => AiError::LlmHttp {
                    provider: PROVIDER_LABEL.to_string(),
                    status,
                    message: message.to_string(),
                },
                None => AiError::Payload(detail),
            }
        }
        Err(_) => AiError::LlmHttp {
            provider: PROVIDER_LABEL.to_string(),
            status,
            message: if body.trim().is_empty() {
                "empty response body".to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

fn stream_error(error: Value) -> AiError {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => AiError::Llm(format!("Stream error: {}", message)),
        None => AiError::Payload(error),
    }
}

impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete_stream(&self, request: CompletionRequest) -> StreamResult {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = self.stream_url();
        let body = self.build_body(&request);
        let model = self.model.clone();

        Box::pin(async_stream::stream! {
            if api_key.trim().is_empty() {
                yield Err(AiError::MissingApiKey("Google Generative AI".to_string()));
                return;
            }

            tracing::debug!(model = %model, contents = body.contents.len(), "Sending Gemini streaming request");

            let response = match client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AiError::Http(e));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                tracing::warn!(model = %model, status = status.as_u16(), "Gemini API returned an error");
                yield Err(http_error(status.as_u16(), &text));
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut seen_sources: HashSet<String> = HashSet::new();
            let mut finish_reason: Option<FinishReason> = None;
            let mut usage: Option<TokenUsage> = None;
            let mut closed = false;

            while !closed {
                let payloads = match byte_stream.next().await {
                    Some(Ok(bytes)) => decoder.push(&bytes),
                    Some(Err(e)) => {
                        yield Err(AiError::Http(e));
                        return;
                    }
                    None => {
                        closed = true;
                        decoder.finish().into_iter().collect()
                    }
                };

                for data in payloads {
                    let event: GeminiStreamResponse = match serde_json::from_str(&data) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!(model = %model, error = %e, "Malformed Gemini stream event");
                            yield Err(AiError::InvalidFormat(format!("Gemini stream event: {e}")));
                            return;
                        }
                    };

                    if let Some(error) = event.error {
                        yield Err(stream_error(error));
                        return;
                    }

                    if let Some(metadata) = event.usage_metadata {
                        usage = Some(metadata.into());
                    }

                    if event
                        .prompt_feedback
                        .and_then(|feedback| feedback.block_reason)
                        .is_some()
                    {
                        finish_reason = Some(FinishReason::ContentFilter);
                    }

                    let Some(candidate) = event.candidates.into_iter().next() else {
                        continue;
                    };

                    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                        if let Some(inline) = part.inline_data {
                            yield Ok(StreamChunk::file(GeneratedFile {
                                media_type: inline.mime_type,
                                base64: inline.data,
                            }));
                            continue;
                        }

                        let Some(text) = part.text.filter(|t| !t.is_empty()) else {
                            continue;
                        };
                        if part.thought.unwrap_or(false) {
                            yield Ok(StreamChunk::reasoning(text));
                        } else {
                            yield Ok(StreamChunk::text(text));
                        }
                    }

                    let grounding = candidate
                        .grounding_metadata
                        .map(|g| g.grounding_chunks)
                        .unwrap_or_default();
                    for web in grounding.into_iter().filter_map(|chunk| chunk.web) {
                        let Some(uri) = web.uri else {
                            continue;
                        };
                        if seen_sources.insert(uri.clone()) {
                            yield Ok(StreamChunk::source(Source {
                                url: uri,
                                title: web.title,
                            }));
                        }
                    }

                    if let Some(reason) = candidate.finish_reason {
                        finish_reason = Some(map_finish_reason(&reason));
                    }
                }
            }

            yield Ok(StreamChunk::final_chunk(
                finish_reason.unwrap_or(FinishReason::Other),
                usage,
            ));
        })
    }
}
