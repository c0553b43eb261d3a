//! Conversion from UI messages to provider messages

use parla_models::{MessagePart, Role as UiRole, UiMessage};

use crate::llm::{ChatMessage, ContentPart, FileData, Role};

/// Convert the client's message history into provider messages.
///
/// Citations, step markers and unsupported parts carry no model input and
/// are dropped, as are messages left without content.
pub fn convert_to_model_messages(messages: &[UiMessage]) -> Vec<ChatMessage> {
    messages.iter().filter_map(convert_message).collect()
}

fn convert_message(message: &UiMessage) -> Option<ChatMessage> {
    let role = match message.role {
        UiRole::System => Role::System,
        UiRole::User => Role::User,
        UiRole::Assistant => Role::Assistant,
    };

    let content: Vec<ContentPart> = message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text, .. } if !text.is_empty() => {
                Some(ContentPart::Text(text.clone()))
            }
            MessagePart::Reasoning { text, .. }
                if role == Role::Assistant && !text.is_empty() =>
            {
                Some(ContentPart::Reasoning(text.clone()))
            }
            MessagePart::File {
                media_type, url, ..
            } if role != Role::System => Some(ContentPart::File {
                media_type: media_type.clone(),
                data: file_data(url),
            }),
            _ => None,
        })
        .collect();

    if content.is_empty() {
        None
    } else {
        Some(ChatMessage { role, content })
    }
}

/// `data:<type>;base64,<payload>` URLs become inline payloads; anything else
/// is passed on as a reference.
fn file_data(url: &str) -> FileData {
    url.strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .filter(|(header, _)| header.ends_with(";base64"))
        .map(|(_, payload)| FileData::Base64(payload.to_string()))
        .unwrap_or_else(|| FileData::Url(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: UiRole, parts: Vec<MessagePart>) -> UiMessage {
        UiMessage {
            id: "m".to_string(),
            role,
            parts,
            metadata: None,
        }
    }

    #[test]
    fn test_user_and_assistant_parts() {
        let history = vec![
            message(UiRole::User, vec![MessagePart::text("Ciao")]),
            message(
                UiRole::Assistant,
                vec![
                    MessagePart::StepStart,
                    MessagePart::reasoning("greeting"),
                    MessagePart::text("Ciao!"),
                    MessagePart::SourceUrl {
                        source_id: "s1".to_string(),
                        url: "https://example.com".to_string(),
                        title: None,
                    },
                ],
            ),
        ];

        let converted = convert_to_model_messages(&history);

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0], ChatMessage::user("Ciao"));
        assert_eq!(
            converted[1].content,
            vec![
                ContentPart::Reasoning("greeting".to_string()),
                ContentPart::Text("Ciao!".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_messages_are_dropped() {
        let history = vec![
            message(UiRole::Assistant, vec![MessagePart::StepStart]),
            message(UiRole::User, vec![MessagePart::text("")]),
        ];
        assert!(convert_to_model_messages(&history).is_empty());
    }

    #[test]
    fn test_file_parts() {
        let history = vec![message(
            UiRole::User,
            vec![
                MessagePart::File {
                    media_type: "image/png".to_string(),
                    filename: None,
                    url: "data:image/png;base64,iVBOR".to_string(),
                },
                MessagePart::File {
                    media_type: "application/pdf".to_string(),
                    filename: Some("doc.pdf".to_string()),
                    url: "https://example.com/doc.pdf".to_string(),
                },
            ],
        )];

        let converted = convert_to_model_messages(&history);
        assert_eq!(
            converted[0].content,
            vec![
                ContentPart::File {
                    media_type: "image/png".to_string(),
                    data: FileData::Base64("iVBOR".to_string()),
                },
                ContentPart::File {
                    media_type: "application/pdf".to_string(),
                    data: FileData::Url("https://example.com/doc.pdf".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_system_message_keeps_text_only() {
        let history = vec![message(UiRole::System, vec![MessagePart::text("Be brief.")])];
        assert_eq!(
            convert_to_model_messages(&history),
            vec![ChatMessage::system("Be brief.")]
        );
    }
}
