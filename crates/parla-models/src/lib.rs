//! Parla Models - wire types shared by the chat server and client
//!
//! This crate provides:
//! - UI messages and their parts, as exchanged between client and server
//! - Per-request generation settings and the `/api/chat` request body
//! - The UI message stream protocol events relayed back to the client
//! - An incremental SSE decoder

pub mod message;
pub mod settings;
pub mod sse;
pub mod stream;

pub use message::{MessageMetadata, MessagePart, PartState, Role, TokenUsage, UiMessage};
pub use settings::{
    ChatRequest, DEFAULT_CLIENT_SYSTEM_PROMPT, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, GenerationSettings, MAX_OUTPUT_TOKENS_RANGE, SUPPORTED_MODELS,
};
pub use sse::SseDecoder;
pub use stream::{DONE_SENTINEL, UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION, UiStreamEvent};
