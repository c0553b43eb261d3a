use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use parla_client::render::{export_markdown, source_url_label, usage_label};
use parla_client::{ChatSession, ChatStatus, ChatTransport};
use parla_models::{SUPPORTED_MODELS, UiStreamEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Exit,
    Clear,
    Export(Option<String>),
    Settings,
    Model(String),
    Temperature(String),
    MaxTokens(String),
    System(String),
    Unknown(String),
    Message(String),
}

fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Message(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "help" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        "clear" => Command::Clear,
        "export" => Command::Export(Some(arg.to_string()).filter(|a| !a.is_empty())),
        "settings" => Command::Settings,
        "model" => Command::Model(arg.to_string()),
        "temperature" => Command::Temperature(arg.to_string()),
        "max-tokens" => Command::MaxTokens(arg.to_string()),
        "system" => Command::System(arg.to_string()),
        other => Command::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("{}", "Comandi:".bold());
    println!("  /settings             show the current settings");
    println!("  /model <name>         {}", SUPPORTED_MODELS.join(" | ").dimmed());
    println!("  /temperature <0-1>    sampling temperature");
    println!("  /max-tokens <n>       maximum output tokens");
    println!("  /system <prompt>      system prompt");
    println!("  /export [file]        markdown transcript");
    println!("  /clear                start a new conversation");
    println!("  /exit                 quit");
}

fn print_settings(session: &ChatSession) {
    let settings = &session.settings;
    println!("{} {}", "model:".dimmed(), settings.model());
    println!("{} {:.2}", "temperature:".dimmed(), settings.temperature());
    println!("{} {}", "max tokens:".dimmed(), settings.max_output_tokens());
    println!("{} {}", "system:".dimmed(), settings.system_prompt);
}

/// Prints each event as it arrives
#[derive(Default)]
struct StreamPrinter {
    in_reasoning: bool,
    saw_error: bool,
}

impl StreamPrinter {
    fn on_event(&mut self, event: &UiStreamEvent) {
        match event {
            UiStreamEvent::Start { .. } => println!("{}", "🤖 AI".cyan().bold()),
            UiStreamEvent::ReasoningStart { .. } => self.in_reasoning = true,
            UiStreamEvent::ReasoningDelta { delta, .. } => print!("{}", delta.dimmed().italic()),
            UiStreamEvent::ReasoningEnd { .. } => {
                self.in_reasoning = false;
                println!();
            }
            UiStreamEvent::TextDelta { delta, .. } => print!("{delta}"),
            UiStreamEvent::TextEnd { .. } => println!(),
            UiStreamEvent::SourceUrl { url, title, .. } => {
                println!("{}", format!("[{}]", source_url_label(url, title.as_deref())).blue());
            }
            UiStreamEvent::File { media_type, .. } if media_type.starts_with("image/") => {
                println!("{}", format!("[immagine {media_type}]").blue());
            }
            UiStreamEvent::Finish { message_metadata } => {
                if let Some(usage) = message_metadata.as_ref().and_then(|m| m.total_usage) {
                    println!("{}", usage_label(&usage).dimmed());
                }
            }
            UiStreamEvent::Error { error_text } => {
                if self.in_reasoning {
                    println!();
                }
                self.saw_error = true;
                eprintln!("{} {}", "Errore:".red().bold(), error_text);
            }
            _ => {}
        }
        let _ = std::io::stdout().flush();
    }
}

pub async fn run(mut session: ChatSession, transport: &dyn ChatTransport) -> Result<()> {
    println!("{} {}", "parla".bold(), "- /help per i comandi".dimmed());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "👤 Tu ›".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Command::Help => print_help(),
            Command::Exit => break,
            Command::Clear => {
                session.clear();
                println!("{}", "Nuova conversazione".dimmed());
            }
            Command::Export(path) => {
                let markdown = export_markdown(session.messages());
                match path {
                    Some(path) => {
                        std::fs::write(&path, markdown)?;
                        println!("{} {}", "Esportato in".dimmed(), path);
                    }
                    None => println!("{markdown}"),
                }
            }
            Command::Settings => print_settings(&session),
            Command::Model(model) => {
                if session.settings.set_model(&model) {
                    println!("{} {}", "model:".dimmed(), session.settings.model());
                } else {
                    eprintln!(
                        "{} unknown model '{}' ({})",
                        "Errore:".red().bold(),
                        model,
                        SUPPORTED_MODELS.join(", ")
                    );
                }
            }
            Command::Temperature(value) => match value.parse::<f32>() {
                Ok(temperature) => {
                    session.settings.set_temperature(temperature);
                    println!("{} {:.2}", "temperature:".dimmed(), session.settings.temperature());
                }
                Err(_) => eprintln!("{} expected a number", "Errore:".red().bold()),
            },
            Command::MaxTokens(value) => match value.parse::<u32>() {
                Ok(tokens) => {
                    session.settings.set_max_output_tokens(tokens);
                    println!("{} {}", "max tokens:".dimmed(), session.settings.max_output_tokens());
                }
                Err(_) => eprintln!("{} expected a whole number", "Errore:".red().bold()),
            },
            Command::System(prompt) => {
                session.settings.system_prompt = prompt;
                println!("{} {}", "system:".dimmed(), session.settings.system_prompt);
            }
            Command::Unknown(name) => {
                eprintln!("{} unknown command '/{}'", "Errore:".red().bold(), name);
            }
            Command::Message(_) if session.status() == ChatStatus::Error => {
                eprintln!(
                    "{} the last reply failed; /clear to start over",
                    "Errore:".red().bold()
                );
            }
            Command::Message(text) => {
                session.set_input(text);
                let mut printer = StreamPrinter::default();
                session
                    .send(transport, |_, event| printer.on_event(event))
                    .await;
                // transport failures never arrive as events
                if session.status() == ChatStatus::Error
                    && !printer.saw_error
                    && let Some(error) = session.error()
                {
                    eprintln!("{} {}", "Errore:".red().bold(), error);
                }
                if session.status() == ChatStatus::Error {
                    println!("{}", "/clear to start a new conversation".dimmed());
                }
            }
        }
    }

    Ok(())
}
