//! The `pull` subcommand: download a model with live progress.

use std::error::Error;
use std::io::{self, Write};

use crate::core::download::{spawn_download, DownloadEvent, DownloadParams};

pub async fn pull_model(base_url: &str, name: &str) -> Result<(), Box<dyn Error>> {
    let mut handle = spawn_download(DownloadParams {
        client: reqwest::Client::new(),
        base_url: base_url.to_string(),
        model_name: name.to_string(),
        idle_timeout: None,
    });

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(DownloadEvent::Progress { status, percent }) => {
                    // \x1b[K clears leftovers from a longer previous status.
                    match percent {
                        Some(percent) => print!("\r\x1b[K{status}: {percent:.1}%"),
                        None => print!("\r\x1b[K{status}"),
                    }
                    io::stdout().flush()?;
                }
                Some(DownloadEvent::Completed) => {
                    println!("\nModel '{name}' downloaded.");
                    return Ok(());
                }
                Some(DownloadEvent::Failed(message)) => {
                    println!();
                    return Err(message.into());
                }
                None => {
                    println!();
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                println!("\nDownload cancelled. Pulling again will resume.");
                return Ok(());
            }
        }
    }
}
