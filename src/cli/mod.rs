//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches to the chat loop
//! or the model-management subcommands.

pub mod chat_loop;
pub mod model_list;
pub mod pull;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::api::models::delete_model;
use crate::cli::chat_loop::{run_chat, ChatOptions};
use crate::core::config::Config;
use crate::core::constants::DEFAULT_BASE_URL;
use crate::core::session::SessionBook;

#[derive(Parser)]
#[command(name = "charla")]
#[command(version)]
#[command(about = "A terminal chat client for a local Ollama server")]
#[command(
    long_about = "Charla is a terminal chat client for a locally-running Ollama server. \
Responses stream in token by token and can be stopped mid-generation.\n\n\
The server must be running first: `ollama serve`.\n\n\
Chat commands:\n\
  /new              Start a new chat session\n\
  /sessions         List saved sessions\n\
  /switch <n>       Switch to session number n\n\
  /rename <name>    Rename the current session\n\
  /delete           Delete the current session\n\
  /model <name>     Switch to another installed model\n\
  /log [file]       Enable transcript logging, or pause/resume it\n\
  /quit             Exit\n\n\
Ctrl+C while a response is streaming stops that response instead of exiting."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with (defaults to the configured default, then the first
    /// installed model)
    #[arg(short, long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the Ollama server
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log the chat transcript to the given file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List models installed on the server
    Models,
    /// Download a model onto the server
    Pull {
        /// Model name, e.g. llama3.2, mistral, codellama
        name: String,
    },
    /// Remove an installed model from the server
    Delete {
        /// Name of the installed model
        name: String,
    },
    /// List saved chat sessions
    Sessions,
    /// Set a configuration value (base-url, default-model, temperature,
    /// max-tokens, system-prompt)
    Set {
        key: String,
        value: String,
    },
    /// Unset a configuration value
    Unset {
        key: String,
    },
    /// Show the current configuration
    Show,
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    match args.command {
        None | Some(Commands::Chat) => {
            run_chat(ChatOptions {
                base_url,
                model: args.model,
                log_file: args.log,
            })
            .await
        }
        Some(Commands::Models) => model_list::list_models(&base_url).await,
        Some(Commands::Pull { name }) => pull::pull_model(&base_url, &name).await,
        Some(Commands::Delete { name }) => {
            let client = reqwest::Client::new();
            delete_model(&client, &base_url, &name).await?;
            println!("Deleted '{name}'.");
            Ok(())
        }
        Some(Commands::Sessions) => {
            let book = SessionBook::load()?;
            print_sessions(&book);
            Ok(())
        }
        Some(Commands::Set { key, value }) => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {key} = {value}");
            Ok(())
        }
        Some(Commands::Unset { key }) => {
            let mut config = Config::load()?;
            config.unset(&key)?;
            config.save()?;
            println!("Unset {key}");
            Ok(())
        }
        Some(Commands::Show) => {
            config.print_all();
            Ok(())
        }
    }
}

pub fn print_sessions(book: &SessionBook) {
    if book.sessions.is_empty() {
        println!("No saved sessions.");
        return;
    }
    for (index, session) in book.sessions.iter().enumerate() {
        let marker = if index == book.current_index { "*" } else { " " };
        println!(
            "{marker} {}: {} ({}, {}, {} messages)",
            index + 1,
            session.name,
            session.timestamp,
            session.model,
            session.messages.len()
        );
    }
}
