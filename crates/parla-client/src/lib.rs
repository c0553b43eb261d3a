//! Parla client - the chat front end
//!
//! The session state machine, stream assembly and rendering are independent
//! of any particular display; the `parla` binary drives them from a terminal.

pub mod assembler;
pub mod chat;
pub mod error;
pub mod render;
pub mod transport;

pub use assembler::MessageAssembler;
pub use chat::{ChatSession, ChatStatus};
pub use error::{ClientError, Result};
pub use transport::{ChatTransport, EventStream, HttpTransport};
