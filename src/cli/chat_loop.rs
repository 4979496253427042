//! The interactive chat loop.
//!
//! Reads lines from stdin, streams each reply token by token, and handles
//! slash commands for session and model management. Ctrl+C during a stream
//! cancels that stream; the already-printed partial text stays on screen and
//! in the session.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::models::{fetch_models, sort_models};
use crate::core::config::Config;
use crate::core::generation::{
    spawn_generation, GenerationEvent, GenerationParams, GenerationRequest,
};
use crate::core::message::ChatMessage;
use crate::core::session::{preview_name, SessionBook};
use crate::utils::logging::LoggingState;

pub struct ChatOptions {
    pub base_url: String,
    pub model: Option<String>,
    pub log_file: Option<String>,
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run_chat(opts: ChatOptions) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let client = reqwest::Client::new();
    let mut model = resolve_model(&client, &opts, &config).await?;

    let mut book = SessionBook::load()?;
    if book.sessions.is_empty() {
        book.new_session(&model);
    }
    let mut logging = LoggingState::new(opts.log_file.clone())?;

    println!("charla: chatting with {model} at {}", opts.base_url);
    println!("Type a message and press Enter. /help lists commands; Ctrl+C stops a streaming response.");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nyou> ");
        io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match handle_command(command, &client, &opts, &mut model, &mut book, &mut logging)
                .await?
            {
                Flow::Continue => continue,
                Flow::Quit => break,
            }
        }

        stream_reply(
            &client,
            &config,
            &opts.base_url,
            &model,
            &line,
            &mut book,
            &mut logging,
        )
        .await?;
        book.save()?;
    }

    book.save()?;
    Ok(())
}

async fn resolve_model(
    client: &reqwest::Client,
    opts: &ChatOptions,
    config: &Config,
) -> Result<String, Box<dyn Error>> {
    if let Some(model) = &opts.model {
        return Ok(model.clone());
    }
    if let Some(model) = &config.default_model {
        return Ok(model.clone());
    }

    let mut models = fetch_models(client, &opts.base_url).await?;
    sort_models(&mut models);
    match models.first() {
        Some(model) => Ok(model.name.clone()),
        None => Err("no models installed; download one with `charla pull <name>`".into()),
    }
}

fn split_command(command: &str) -> (&str, &str) {
    match command.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    }
}

async fn handle_command(
    command: &str,
    client: &reqwest::Client,
    opts: &ChatOptions,
    model: &mut String,
    book: &mut SessionBook,
    logging: &mut LoggingState,
) -> Result<Flow, Box<dyn Error>> {
    let (name, arg) = split_command(command);
    match name {
        "quit" | "q" | "exit" => return Ok(Flow::Quit),
        "help" => {
            println!("/new, /sessions, /switch <n>, /rename <name>, /delete, /model [name], /log [file], /quit");
        }
        "new" => {
            book.new_session(model);
            book.save()?;
            println!("Started a new session.");
        }
        "sessions" => crate::cli::print_sessions(book),
        "switch" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 && n <= book.sessions.len() => {
                book.current_index = n - 1;
                if let Some(session) = book.current() {
                    *model = session.model.clone();
                    println!("Switched to: {}", session.name);
                    for message in &session.messages {
                        println!("{}: {}", message.role.as_str(), message.content);
                    }
                }
                book.save()?;
            }
            _ => println!("Usage: /switch <n> (see /sessions)"),
        },
        "rename" => {
            if arg.is_empty() {
                println!("Usage: /rename <name>");
            } else {
                book.rename_current(arg);
                book.save()?;
                println!("Renamed session to: {arg}");
            }
        }
        "delete" => {
            book.delete_current();
            if book.sessions.is_empty() {
                book.new_session(model);
            }
            book.save()?;
            println!("Session deleted.");
        }
        "model" => {
            if arg.is_empty() {
                println!("Current model: {model}");
            } else {
                let installed = fetch_models(client, &opts.base_url).await?;
                if installed.iter().any(|m| m.name == arg) {
                    *model = arg.to_string();
                    if let Some(session) = book.current_mut() {
                        session.model = arg.to_string();
                    }
                    book.save()?;
                    println!("Now chatting with {arg}.");
                } else {
                    println!("Model '{arg}' is not installed. Try: charla pull {arg}");
                }
            }
        }
        "log" => {
            let result = if arg.is_empty() {
                logging.toggle()
            } else {
                logging.set_log_file(arg.to_string())
            };
            match result {
                Ok(message) => println!("{message}"),
                Err(err) => println!("{err}"),
            }
        }
        _ => println!("Unknown command: /{name} (try /help)"),
    }
    Ok(Flow::Continue)
}

async fn stream_reply(
    client: &reqwest::Client,
    config: &Config,
    base_url: &str,
    model: &str,
    prompt: &str,
    book: &mut SessionBook,
    logging: &mut LoggingState,
) -> Result<(), Box<dyn Error>> {
    let request = GenerationRequest {
        model: model.to_string(),
        prompt: prompt.to_string(),
        system_prompt: config.system_prompt.clone(),
        temperature: config.temperature_or_default(),
        max_tokens: config.max_tokens_or_default(),
    };

    if book.current().is_none() {
        book.new_session(model);
    }
    if let Some(session) = book.current_mut() {
        if session.messages.is_empty() {
            session.name = preview_name(prompt);
        }
        session.messages.push(ChatMessage::user(prompt));
    }
    logging.log_message(&format!("You: {prompt}"))?;

    let mut handle = spawn_generation(GenerationParams {
        client: client.clone(),
        base_url: base_url.to_string(),
        request,
        idle_timeout: None,
    });

    let mut failure: Option<String> = None;
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(GenerationEvent::Token(token)) => {
                    print!("{token}");
                    io::stdout().flush()?;
                }
                Some(GenerationEvent::Completed) => {
                    println!();
                    break;
                }
                Some(GenerationEvent::Cancelled) => {
                    println!("\n[stopped]");
                    break;
                }
                Some(GenerationEvent::Failed(message)) => {
                    println!();
                    failure = Some(message);
                    break;
                }
                None => {
                    println!();
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => handle.cancel(),
        }
    }

    // A stopped or failed response keeps whatever text already streamed.
    let text = handle.text();
    if !text.is_empty() {
        if let Some(session) = book.current_mut() {
            session.messages.push(ChatMessage::assistant(text.clone()));
        }
        logging.log_message(&format!("AI: {text}"))?;
    }
    if let Some(message) = failure {
        eprintln!("{message}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_split_into_name_and_argument() {
        assert_eq!(split_command("quit"), ("quit", ""));
        assert_eq!(split_command("rename My chat"), ("rename", "My chat"));
        assert_eq!(split_command("log  chat.log"), ("log", "chat.log"));
    }
}
