//! Builds an assistant message from UI message stream events

use std::collections::HashMap;

use parla_models::{MessageMetadata, MessagePart, PartState, UiMessage, UiStreamEvent};

/// Tracks which part each stream block id writes to.
///
/// Deltas for an id that was never opened start a new part rather than being
/// dropped, so a stream that skips `*-start` still renders.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    text_parts: HashMap<String, usize>,
    reasoning_parts: HashMap<String, usize>,
}

#[derive(Clone, Copy)]
enum BlockKind {
    Text,
    Reasoning,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to `message`. Returns true when the message changed.
    pub fn apply(&mut self, message: &mut UiMessage, event: &UiStreamEvent) -> bool {
        match event {
            UiStreamEvent::Start {
                message_id,
                message_metadata,
            } => {
                if let Some(id) = message_id {
                    message.id = id.clone();
                }
                if let Some(metadata) = message_metadata {
                    merge_metadata(message, metadata.clone());
                }
                true
            }
            UiStreamEvent::StartStep => {
                message.parts.push(MessagePart::StepStart);
                true
            }
            UiStreamEvent::TextStart { id } => {
                self.open(message, BlockKind::Text, id);
                true
            }
            UiStreamEvent::TextDelta { id, delta } => {
                self.append(message, BlockKind::Text, id, delta);
                true
            }
            UiStreamEvent::TextEnd { id } => self.close(message, BlockKind::Text, id),
            UiStreamEvent::ReasoningStart { id } => {
                self.open(message, BlockKind::Reasoning, id);
                true
            }
            UiStreamEvent::ReasoningDelta { id, delta } => {
                self.append(message, BlockKind::Reasoning, id, delta);
                true
            }
            UiStreamEvent::ReasoningEnd { id } => self.close(message, BlockKind::Reasoning, id),
            UiStreamEvent::SourceUrl {
                source_id,
                url,
                title,
            } => {
                message.parts.push(MessagePart::SourceUrl {
                    source_id: source_id.clone(),
                    url: url.clone(),
                    title: title.clone(),
                });
                true
            }
            UiStreamEvent::SourceDocument {
                source_id,
                media_type,
                title,
                filename,
            } => {
                message.parts.push(MessagePart::SourceDocument {
                    source_id: source_id.clone(),
                    media_type: media_type.clone(),
                    title: title.clone(),
                    filename: filename.clone(),
                });
                true
            }
            UiStreamEvent::File { url, media_type } => {
                message.parts.push(MessagePart::File {
                    media_type: media_type.clone(),
                    filename: None,
                    url: url.clone(),
                });
                true
            }
            UiStreamEvent::MessageMetadata { message_metadata } => {
                merge_metadata(message, message_metadata.clone());
                true
            }
            UiStreamEvent::Finish {
                message_metadata: Some(metadata),
            } => {
                merge_metadata(message, metadata.clone());
                true
            }
            UiStreamEvent::Finish {
                message_metadata: None,
            }
            | UiStreamEvent::FinishStep
            | UiStreamEvent::Error { .. }
            | UiStreamEvent::Unsupported => false,
        }
    }

    /// Mark every part still receiving deltas as done
    pub fn finalize(&mut self, message: &mut UiMessage) {
        for index in self.text_parts.drain().chain(self.reasoning_parts.drain()).map(|(_, i)| i) {
            set_done(message, index);
        }
    }

    fn blocks(&mut self, kind: BlockKind) -> &mut HashMap<String, usize> {
        match kind {
            BlockKind::Text => &mut self.text_parts,
            BlockKind::Reasoning => &mut self.reasoning_parts,
        }
    }

    fn open(&mut self, message: &mut UiMessage, kind: BlockKind, id: &str) -> usize {
        let part = match kind {
            BlockKind::Text => MessagePart::Text {
                text: String::new(),
                state: Some(PartState::Streaming),
            },
            BlockKind::Reasoning => MessagePart::Reasoning {
                text: String::new(),
                state: Some(PartState::Streaming),
            },
        };
        message.parts.push(part);
        let index = message.parts.len() - 1;
        self.blocks(kind).insert(id.to_string(), index);
        index
    }

    fn append(&mut self, message: &mut UiMessage, kind: BlockKind, id: &str, delta: &str) {
        let existing = self.blocks(kind).get(id).copied();
        let index = match existing {
            Some(index) => index,
            None => {
                tracing::debug!(id, "Delta for unopened block");
                self.open(message, kind, id)
            }
        };
        if let Some(
            MessagePart::Text { text, .. } | MessagePart::Reasoning { text, .. },
        ) = message.parts.get_mut(index)
        {
            text.push_str(delta);
        }
    }

    fn close(&mut self, message: &mut UiMessage, kind: BlockKind, id: &str) -> bool {
        match self.blocks(kind).remove(id) {
            Some(index) => {
                set_done(message, index);
                true
            }
            None => false,
        }
    }
}

fn set_done(message: &mut UiMessage, index: usize) {
    if let Some(
        MessagePart::Text { state, .. } | MessagePart::Reasoning { state, .. },
    ) = message.parts.get_mut(index)
    {
        *state = Some(PartState::Done);
    }
}

fn merge_metadata(message: &mut UiMessage, metadata: MessageMetadata) {
    message
        .metadata
        .get_or_insert_with(MessageMetadata::default)
        .merge(metadata);
}
