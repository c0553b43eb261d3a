//! Chat session state
//!
//! A session owns the conversation, the pending input and the generation
//! settings. Submitting moves it to `Submitted`; the first content event
//! moves it to `Streaming`; `finish` returns it to `Ready` and an error
//! event or transport failure leaves it in `Error`. Only `Ready` accepts a
//! new submission; `clear` is the way out of `Error`.

use futures::StreamExt;
use parla_models::{ChatRequest, GenerationSettings, Role, UiMessage, UiStreamEvent};

use crate::assembler::MessageAssembler;
use crate::transport::ChatTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStatus {
    Ready,
    Submitted,
    Streaming,
    Error,
}

impl ChatStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitted | Self::Streaming)
    }
}

#[derive(Debug)]
pub struct ChatSession {
    id: String,
    messages: Vec<UiMessage>,
    status: ChatStatus,
    input: String,
    error: Option<String>,
    /// Index of the assistant message the current stream writes to
    streaming: Option<usize>,
    assembler: MessageAssembler,
    /// Bumped on every visible change; views scroll to the end when it moves
    revision: u64,
    pub settings: GenerationSettings,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(GenerationSettings::default())
    }
}

impl ChatSession {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            status: ChatStatus::Ready,
            input: String::new(),
            error: None,
            streaming: None,
            assembler: MessageAssembler::new(),
            revision: 0,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// The input field accepts edits only once the previous reply is complete
    pub fn input_enabled(&self) -> bool {
        self.status == ChatStatus::Ready
    }

    pub fn can_send(&self) -> bool {
        self.input_enabled() && !self.input.trim().is_empty()
    }

    /// Append the pending input as a user message and build the request.
    ///
    /// Returns `None` without touching the session when the input is blank
    /// or the session is not `Ready`.
    pub fn submit(&mut self) -> Option<ChatRequest> {
        if !self.can_send() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.messages.push(UiMessage::user_text(text));
        self.status = ChatStatus::Submitted;
        self.error = None;
        self.touch();

        Some(ChatRequest::new(
            self.id.clone(),
            self.messages.clone(),
            &self.settings,
        ))
    }

    /// Fold one stream event into the conversation
    pub fn apply_event(&mut self, event: &UiStreamEvent) {
        if !self.status.is_busy() {
            tracing::debug!(status = ?self.status, "Ignoring event outside a pending reply");
            return;
        }

        match event {
            UiStreamEvent::Error { error_text } => {
                self.fail(error_text.clone());
                return;
            }
            UiStreamEvent::Start { message_id, .. } => {
                self.target(message_id.as_deref());
            }
            _ => {
                self.target(None);
            }
        }

        let Some(index) = self.streaming else {
            return;
        };
        self.status = ChatStatus::Streaming;
        let changed = self.assembler.apply(&mut self.messages[index], event);

        if matches!(event, UiStreamEvent::Finish { .. }) {
            self.end_reply(ChatStatus::Ready);
        } else if changed {
            self.touch();
        }
    }

    /// Record a failed reply. Partial content stays in the conversation.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::warn!(error = %error, "Chat reply failed");
        self.error = Some(error);
        self.end_reply(ChatStatus::Error);
    }

    /// Called when the event stream closes. A stream that ends without
    /// `finish` or `error` still releases the session.
    pub fn end_of_stream(&mut self) {
        if self.status.is_busy() {
            self.end_reply(ChatStatus::Ready);
        }
    }

    /// Submit the pending input through `transport` and consume the reply.
    ///
    /// `on_event` sees each event after it has been applied. Returns false
    /// when nothing was submitted.
    pub async fn send<T, F>(&mut self, transport: &T, mut on_event: F) -> bool
    where
        T: ChatTransport + ?Sized,
        F: FnMut(&ChatSession, &UiStreamEvent),
    {
        let Some(request) = self.submit() else {
            return false;
        };

        let mut events = match transport.send(request).await {
            Ok(events) => events,
            Err(e) => {
                self.fail(e.to_string());
                return true;
            }
        };

        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    self.apply_event(&event);
                    on_event(self, &event);
                    if event.is_terminal() {
                        break;
                    }
                }
                Err(e) => {
                    self.fail(e.to_string());
                    return true;
                }
            }
        }

        self.end_of_stream();
        true
    }

    /// Start a new conversation with a fresh id, keeping the settings
    pub fn clear(&mut self) {
        self.id = uuid::Uuid::new_v4().to_string();
        self.messages.clear();
        self.status = ChatStatus::Ready;
        self.error = None;
        self.streaming = None;
        self.assembler = MessageAssembler::new();
        self.touch();
    }

    /// Pick the assistant message the stream writes to. A `start` naming the
    /// trailing assistant message continues it.
    fn target(&mut self, message_id: Option<&str>) {
        if self.streaming.is_some() {
            return;
        }

        let continues = self
            .messages
            .last()
            .filter(|last| last.role == Role::Assistant)
            .is_some_and(|last| Some(last.id.as_str()) == message_id);

        if !continues {
            let id = message_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            self.messages.push(UiMessage::assistant(id));
        }
        self.streaming = Some(self.messages.len() - 1);
        self.touch();
    }

    fn end_reply(&mut self, status: ChatStatus) {
        if let Some(index) = self.streaming.take() {
            self.assembler.finalize(&mut self.messages[index]);
        }
        self.assembler = MessageAssembler::new();
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, Result};
    use crate::transport::EventStream;
    use async_trait::async_trait;
    use futures::stream;
    use parla_models::{MessageMetadata, MessagePart, TokenUsage};
    use std::sync::Mutex;

    /// Replays fixed events and records every request
    struct ScriptedTransport {
        events: Vec<UiStreamEvent>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn new(events: Vec<UiStreamEvent>) -> Self {
            Self {
                events,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: ChatRequest) -> Result<EventStream> {
            self.requests.lock().unwrap().push(request);
            let items: Vec<Result<UiStreamEvent>> = self.events.iter().cloned().map(Ok).collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl ChatTransport for RefusingTransport {
        async fn send(&self, _request: ChatRequest) -> Result<EventStream> {
            Err(ClientError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    }

    fn reply(id: &str, deltas: &[&str], total_tokens: u32) -> Vec<UiStreamEvent> {
        let mut events = vec![
            UiStreamEvent::Start {
                message_id: Some(id.to_string()),
                message_metadata: None,
            },
            UiStreamEvent::StartStep,
            UiStreamEvent::TextStart { id: "0".to_string() },
        ];
        events.extend(deltas.iter().map(|delta| UiStreamEvent::TextDelta {
            id: "0".to_string(),
            delta: delta.to_string(),
        }));
        events.extend([
            UiStreamEvent::TextEnd { id: "0".to_string() },
            UiStreamEvent::FinishStep,
            UiStreamEvent::Finish {
                message_metadata: Some(MessageMetadata::with_total_usage(TokenUsage {
                    total_tokens,
                    ..TokenUsage::default()
                })),
            },
        ]);
        events
    }

    #[test]
    fn test_blank_submit_is_a_no_op() {
        let mut session = ChatSession::default();
        for input in ["", "   ", "\n\t"] {
            session.set_input(input);
            assert!(!session.can_send());
            assert!(session.submit().is_none());
        }
        assert!(session.messages().is_empty());
        assert_eq!(session.status(), ChatStatus::Ready);
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn test_submit_appends_exactly_one_user_message() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");

        let request = session.submit().unwrap();

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[0].text(), "Ciao");
        assert_eq!(session.input(), "");
        assert_eq!(session.status(), ChatStatus::Submitted);
        assert_eq!(request.id, session.id());
        assert_eq!(request.messages, session.messages());
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_output_tokens, Some(10_000));
    }

    #[test]
    fn test_send_is_disabled_while_a_reply_is_pending() {
        let mut session = ChatSession::default();
        session.set_input("first");
        session.submit().unwrap();

        session.set_input("second");
        assert!(!session.input_enabled());
        assert!(!session.can_send());
        assert!(session.submit().is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_events_stream_into_one_assistant_message() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");
        session.submit().unwrap();

        let events = reply("a1", &["Cia", "o!"], 15);
        session.apply_event(&events[0]);
        assert_eq!(session.status(), ChatStatus::Streaming);

        for event in &events[1..] {
            session.apply_event(event);
        }

        assert_eq!(session.status(), ChatStatus::Ready);
        assert_eq!(session.messages().len(), 2);
        let assistant = &session.messages()[1];
        assert_eq!(assistant.id, "a1");
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.text(), "Ciao!");
        assert_eq!(assistant.total_usage().map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_revision_advances_with_each_delta() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");
        session.submit().unwrap();

        let mut last = session.revision();
        for event in reply("a1", &["a", "b", "c"], 3) {
            session.apply_event(&event);
            if matches!(event, UiStreamEvent::TextDelta { .. }) {
                assert!(session.revision() > last);
            }
            last = session.revision();
        }
    }

    #[test]
    fn test_error_event_blocks_resubmission_until_clear() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");
        session.submit().unwrap();
        session.apply_event(&UiStreamEvent::Start {
            message_id: Some("a1".to_string()),
            message_metadata: None,
        });
        session.apply_event(&UiStreamEvent::TextDelta {
            id: "0".to_string(),
            delta: "parz".to_string(),
        });
        session.apply_event(&UiStreamEvent::error("quota exceeded"));

        assert_eq!(session.status(), ChatStatus::Error);
        assert_eq!(session.error(), Some("quota exceeded"));
        assert_eq!(session.messages()[1].text(), "parz");

        session.set_input("Riprova");
        assert!(!session.input_enabled());
        assert!(!session.can_send());
        assert!(session.submit().is_none());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.status(), ChatStatus::Error);

        session.clear();
        assert_eq!(session.status(), ChatStatus::Ready);
        assert!(session.submit().is_some());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_events_after_finish_are_ignored() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");
        session.submit().unwrap();
        for event in reply("a1", &["ok"], 2) {
            session.apply_event(&event);
        }
        session.apply_event(&UiStreamEvent::TextDelta {
            id: "0".to_string(),
            delta: "late".to_string(),
        });
        assert_eq!(session.messages()[1].text(), "ok");
    }

    #[test]
    fn test_reply_after_user_message_opens_new_assistant_message() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");
        session.submit().unwrap();
        for event in reply("a1", &["Cia"], 1) {
            session.apply_event(&event);
        }

        session.set_input("continua");
        session.submit().unwrap();
        // the user message trails, so a reused id still opens a new message
        for event in reply("a1", &["o!"], 2) {
            session.apply_event(&event);
        }
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_send_drives_a_full_exchange() {
        let transport = ScriptedTransport::new(reply("a1", &["Cia", "o!"], 15));
        let mut session = ChatSession::default();
        session.set_input("Ciao");

        let mut seen = Vec::new();
        let sent = session
            .send(&transport, |session, _event| seen.push(session.status()))
            .await;

        assert!(sent);
        assert_eq!(seen.last(), Some(&ChatStatus::Ready));
        assert!(seen.contains(&ChatStatus::Streaming));
        assert_eq!(session.messages()[1].text(), "Ciao!");
        assert!(matches!(
            session.messages()[1].parts[0],
            MessagePart::StepStart
        ));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].system_prompt.as_deref(),
            Some("Sei un assistente AI che risponde in Italiano.")
        );
    }

    #[tokio::test]
    async fn test_send_with_blank_input_does_not_call_transport() {
        let transport = ScriptedTransport::new(Vec::new());
        let mut session = ChatSession::default();
        session.set_input("  ");

        assert!(!session.send(&transport, |_, _| {}).await);
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_moves_to_error() {
        let mut session = ChatSession::default();
        session.set_input("Ciao");

        session.send(&RefusingTransport, |_, _| {}).await;

        assert_eq!(session.status(), ChatStatus::Error);
        assert_eq!(session.error(), Some("Server returned 502: bad gateway"));
        assert!(!session.input_enabled());
        session.set_input("Ciao");
        assert!(!session.send(&RefusingTransport, |_, _| {}).await);
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_closing_without_finish_releases_session() {
        let transport = ScriptedTransport::new(vec![UiStreamEvent::TextDelta {
            id: "0".to_string(),
            delta: "cut".to_string(),
        }]);
        let mut session = ChatSession::default();
        session.set_input("Ciao");

        session.send(&transport, |_, _| {}).await;

        assert_eq!(session.status(), ChatStatus::Ready);
        assert_eq!(session.messages()[1].text(), "cut");
    }

    #[test]
    fn test_clear_starts_a_new_conversation() {
        let mut session = ChatSession::default();
        session.settings.set_temperature(0.3);
        let old_id = session.id().to_string();
        session.set_input("Ciao");
        session.submit().unwrap();

        session.clear();

        assert!(session.messages().is_empty());
        assert_ne!(session.id(), old_id);
        assert_eq!(session.status(), ChatStatus::Ready);
        assert!((session.settings.temperature() - 0.3).abs() < 1e-6);
    }
}
