//! Rendering of conversations as HTML, terminal text and markdown
//!
//! Within a message, citations are listed first, followed by the content
//! parts in stream order and the token usage line when the reply carried
//! usage metadata.

use parla_models::{MessagePart, Role, TokenUsage, UiMessage};
use pulldown_cmark::{Event, Options, Parser};

use crate::chat::{ChatSession, ChatStatus};

pub const LOADING_LABEL: &str = "Caricamento...";

/// "Tokens utilizzati: N"
pub fn usage_label(usage: &TokenUsage) -> String {
    format!("Tokens utilizzati: {}", usage.total_tokens)
}

/// Label for a web citation: its title, else the URL's host name
pub fn source_url_label(url: &str, title: Option<&str>) -> String {
    if let Some(title) = title {
        return title.to_string();
    }
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Label for a document citation: its title, else its position among the
/// message's document citations
pub fn source_document_label(index: usize, title: Option<&str>) -> String {
    title
        .map(str::to_string)
        .unwrap_or_else(|| format!("Document {index}"))
}

fn author(role: Role) -> &'static str {
    match role {
        Role::User => "👤 Tu",
        Role::Assistant => "🤖 AI",
        Role::System => "⚙️ Sistema",
    }
}

/// Render markdown to HTML. Raw HTML in the source is shown as text.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        other => other,
    });

    let mut out = String::new();
    pulldown_cmark::html::push_html(&mut out, events);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_message_html(message: &UiMessage) -> String {
    let class = match message.role {
        Role::User => "user-message",
        _ => "ai-message",
    };
    let mut html = format!(
        "<div class=\"{class}\"><div class=\"message-header\">{}</div><div class=\"message-content\">",
        author(message.role)
    );

    for part in &message.parts {
        if let MessagePart::SourceUrl { url, title, .. } = part {
            html.push_str(&format!(
                "<span class=\"source-link\">[<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>]</span>",
                escape_html(url),
                escape_html(&source_url_label(url, title.as_deref()))
            ));
        }
    }

    let documents = message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::SourceDocument { title, .. } => Some(title.as_deref()),
            _ => None,
        });
    for (index, title) in documents.enumerate() {
        html.push_str(&format!(
            "<span class=\"source-document\">[<span>{}</span>]</span>",
            escape_html(&source_document_label(index, title))
        ));
    }

    for part in &message.parts {
        match part {
            MessagePart::Text { text, .. } => html.push_str(&markdown_to_html(text)),
            MessagePart::Reasoning { text, .. } => {
                html.push_str(&format!("<pre class=\"reasoning\">{}</pre>", escape_html(text)));
            }
            MessagePart::File { url, .. } if part.is_image() => {
                html.push_str(&format!(
                    "<img src=\"{}\" alt=\"Generated image\" class=\"message-image\">",
                    escape_html(url)
                ));
            }
            _ => {}
        }
    }

    if let Some(usage) = message.total_usage() {
        html.push_str(&format!(
            "<div class=\"token-usage\">{}</div>",
            usage_label(&usage)
        ));
    }

    html.push_str("</div></div>");
    html
}

/// The message list with the loading indicator until the session is ready.
/// The trailing anchor is the auto-scroll target.
pub fn render_conversation_html(session: &ChatSession) -> String {
    let mut html = String::from("<div class=\"messages-container\">");
    for message in session.messages() {
        html.push_str(&render_message_html(message));
    }
    if session.status() != ChatStatus::Ready {
        html.push_str(&format!("<div class=\"loading-message\">{LOADING_LABEL}</div>"));
    }
    html.push_str("<div id=\"messages-end\"></div></div>");
    html
}

/// Plain-text rendering used by the terminal front end
pub fn render_message_text(message: &UiMessage) -> String {
    let mut lines = vec![author(message.role).to_string()];

    let mut citations = Vec::new();
    let mut document_index = 0;
    for part in &message.parts {
        match part {
            MessagePart::SourceUrl { url, title, .. } => {
                citations.push(format!("[{}]", source_url_label(url, title.as_deref())));
            }
            MessagePart::SourceDocument { title, .. } => {
                citations.push(format!(
                    "[{}]",
                    source_document_label(document_index, title.as_deref())
                ));
                document_index += 1;
            }
            _ => {}
        }
    }
    if !citations.is_empty() {
        lines.push(citations.join(" "));
    }

    for part in &message.parts {
        match part {
            MessagePart::Text { text, .. } if !text.is_empty() => lines.push(text.clone()),
            MessagePart::Reasoning { text, .. } if !text.is_empty() => {
                lines.extend(text.lines().map(|line| format!("│ {line}")));
            }
            MessagePart::File { media_type, .. } if part.is_image() => {
                lines.push(format!("[immagine {media_type}]"));
            }
            _ => {}
        }
    }

    if let Some(usage) = message.total_usage() {
        lines.push(usage_label(&usage));
    }
    lines.join("\n")
}

/// Markdown transcript of a conversation
pub fn export_markdown(messages: &[UiMessage]) -> String {
    let mut out = String::from("# Conversazione\n");
    for message in messages {
        out.push_str(&format!("\n## {}\n\n", author(message.role)));
        for part in &message.parts {
            match part {
                MessagePart::Text { text, .. } => {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                MessagePart::Reasoning { text, .. } => {
                    for line in text.lines() {
                        out.push_str(&format!("> {line}\n"));
                    }
                    out.push('\n');
                }
                MessagePart::SourceUrl { url, title, .. } => {
                    out.push_str(&format!(
                        "- [{}]({url})\n",
                        source_url_label(url, title.as_deref())
                    ));
                }
                MessagePart::File { url, .. } if part.is_image() => {
                    out.push_str(&format!("![Generated image]({url})\n\n"));
                }
                _ => {}
            }
        }
        if let Some(usage) = message.total_usage() {
            out.push_str(&format!("_{}_\n", usage_label(&usage)));
        }
    }
    out
}
