//! Relay from provider chunks to the UI message stream protocol

use futures::{Stream, StreamExt};
use parla_models::{MessageMetadata, Role as UiRole, TokenUsage, UiMessage, UiStreamEvent};

use crate::error::AiError;
use crate::failure::FailureReason;
use crate::llm::{StreamChunk, StreamResult};

/// Re-packages one provider stream as UI message stream events.
///
/// The event sequence is `start`, `start-step`, content events, then either
/// `finish-step` + `finish` (carrying `totalUsage` metadata) or a single
/// `error` event.
#[derive(Debug, Clone)]
pub struct UiStreamRelay {
    message_id: String,
    send_reasoning: bool,
    send_sources: bool,
}

impl UiStreamRelay {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            send_reasoning: true,
            send_sources: true,
        }
    }

    /// Continue a trailing assistant message from `history`, or start a new one
    pub fn for_history(history: &[UiMessage]) -> Self {
        let message_id = history
            .last()
            .filter(|message| message.role == UiRole::Assistant)
            .map(|message| message.id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self::new(message_id)
    }

    pub fn with_reasoning(mut self, send: bool) -> Self {
        self.send_reasoning = send;
        self
    }

    pub fn with_sources(mut self, send: bool) -> Self {
        self.send_sources = send;
        self
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn relay(self, mut chunks: StreamResult) -> impl Stream<Item = UiStreamEvent> + Send {
        async_stream::stream! {
            let mut state = RelayState::new(self);
            for event in state.begin() {
                yield event;
            }

            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        for event in state.on_chunk(chunk) {
                            yield event;
                        }
                    }
                    Err(error) => {
                        for event in state.on_error(error) {
                            yield event;
                        }
                        return;
                    }
                }
            }

            for event in state.end() {
                yield event;
            }
        }
    }
}

#[derive(Debug)]
struct RelayState {
    options: UiStreamRelay,
    next_block: usize,
    open_text: Option<String>,
    open_reasoning: Option<String>,
    usage: Option<TokenUsage>,
}

impl RelayState {
    fn new(options: UiStreamRelay) -> Self {
        Self {
            options,
            next_block: 0,
            open_text: None,
            open_reasoning: None,
            usage: None,
        }
    }

    fn begin(&mut self) -> Vec<UiStreamEvent> {
        vec![
            UiStreamEvent::Start {
                message_id: Some(self.options.message_id.clone()),
                message_metadata: None,
            },
            UiStreamEvent::StartStep,
        ]
    }

    fn block_id(&mut self) -> String {
        let id = self.next_block.to_string();
        self.next_block += 1;
        id
    }

    fn close_text(&mut self, events: &mut Vec<UiStreamEvent>) {
        if let Some(id) = self.open_text.take() {
            events.push(UiStreamEvent::TextEnd { id });
        }
    }

    fn close_reasoning(&mut self, events: &mut Vec<UiStreamEvent>) {
        if let Some(id) = self.open_reasoning.take() {
            events.push(UiStreamEvent::ReasoningEnd { id });
        }
    }

    fn on_chunk(&mut self, chunk: StreamChunk) -> Vec<UiStreamEvent> {
        let mut events = Vec::new();

        if let Some(reasoning) = chunk.reasoning.filter(|_| self.options.send_reasoning) {
            self.close_text(&mut events);
            let id = match &self.open_reasoning {
                Some(id) => id.clone(),
                None => {
                    let id = self.block_id();
                    events.push(UiStreamEvent::ReasoningStart { id: id.clone() });
                    self.open_reasoning = Some(id.clone());
                    id
                }
            };
            events.push(UiStreamEvent::ReasoningDelta {
                id,
                delta: reasoning,
            });
        }

        if !chunk.text.is_empty() {
            self.close_reasoning(&mut events);
            let id = match &self.open_text {
                Some(id) => id.clone(),
                None => {
                    let id = self.block_id();
                    events.push(UiStreamEvent::TextStart { id: id.clone() });
                    self.open_text = Some(id.clone());
                    id
                }
            };
            events.push(UiStreamEvent::TextDelta {
                id,
                delta: chunk.text,
            });
        }

        if let Some(source) = chunk.source.filter(|_| self.options.send_sources) {
            events.push(UiStreamEvent::SourceUrl {
                source_id: uuid::Uuid::new_v4().to_string(),
                url: source.url,
                title: source.title,
            });
        }

        if let Some(file) = chunk.file {
            events.push(UiStreamEvent::File {
                url: file.data_url(),
                media_type: file.media_type,
            });
        }

        if chunk.finish_reason.is_some() {
            self.usage = chunk.usage.or(self.usage);
        }

        events
    }

    fn on_error(&mut self, error: AiError) -> Vec<UiStreamEvent> {
        tracing::warn!(message_id = %self.options.message_id, error = %error, "Generation failed");
        vec![UiStreamEvent::error(
            FailureReason::from(error).into_error_text(),
        )]
    }

    fn end(&mut self) -> Vec<UiStreamEvent> {
        let mut events = Vec::new();
        self.close_reasoning(&mut events);
        self.close_text(&mut events);
        events.push(UiStreamEvent::FinishStep);
        events.push(UiStreamEvent::Finish {
            message_metadata: self.usage.map(MessageMetadata::with_total_usage),
        });
        events
    }
}
