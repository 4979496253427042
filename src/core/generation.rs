//! Streaming text generation against `/api/generate`.
//!
//! A generation task is single-use: spawning it moves it straight into its
//! running state, and the first terminal event (`Completed`, `Failed`, or
//! `Cancelled`) is also the last event it ever produces. Events arrive in the
//! order the server emitted them; the task never reorders or batches tokens.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{GenerateChunk, GenerateOptions, GenerateRequest};
use crate::core::error::ApiError;
use crate::core::net;
use crate::utils::url::construct_api_url;

/// One chat turn to generate. Built fresh per send and never mutated after
/// submission.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_prompt: None,
            temperature: crate::core::constants::DEFAULT_TEMPERATURE,
            max_tokens: crate::core::constants::DEFAULT_MAX_TOKENS,
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.model.trim().is_empty() {
            return Err(ApiError::Validation("empty model name".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ApiError::Validation(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ApiError::Validation(
                "max token count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Token(String),
    Completed,
    Failed(String),
    Cancelled,
}

pub struct GenerationParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub request: GenerationRequest,
    /// `None` reproduces the upstream behavior of waiting indefinitely for a
    /// silent server; setting a limit turns a stall into a `Failed` event.
    pub idle_timeout: Option<Duration>,
}

/// Consumer side of one in-flight generation.
pub struct GenerationHandle {
    events: mpsc::UnboundedReceiver<GenerationEvent>,
    cancel: CancellationToken,
    transcript: Arc<Mutex<String>>,
}

impl GenerationHandle {
    pub async fn next_event(&mut self) -> Option<GenerationEvent> {
        self.events.recv().await
    }

    /// Stop the stream. Safe to call more than once and from any state; at
    /// most one `Cancelled` event is delivered, with nothing after it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of everything streamed so far. After cancellation or failure
    /// this holds the partial text, suitable for display as a truncated
    /// response.
    pub fn text(&self) -> String {
        lock_transcript(&self.transcript).clone()
    }
}

fn lock_transcript(transcript: &Mutex<String>) -> std::sync::MutexGuard<'_, String> {
    transcript
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Start a generation task. Validation happens before any network traffic;
/// an invalid request produces a single `Failed` event without a request
/// being issued.
pub fn spawn_generation(params: GenerationParams) -> GenerationHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let transcript = Arc::new(Mutex::new(String::new()));

    let worker_cancel = cancel.clone();
    let worker_transcript = Arc::clone(&transcript);
    tokio::spawn(async move {
        run_generation(params, tx, worker_cancel, worker_transcript).await;
    });

    GenerationHandle {
        events: rx,
        cancel,
        transcript,
    }
}

async fn run_generation(
    params: GenerationParams,
    tx: mpsc::UnboundedSender<GenerationEvent>,
    cancel: CancellationToken,
    transcript: Arc<Mutex<String>>,
) {
    let GenerationParams {
        client,
        base_url,
        request,
        idle_timeout,
    } = params;

    if let Err(err) = request.validate() {
        let _ = tx.send(GenerationEvent::Failed(err.to_string()));
        return;
    }

    debug!(model = %request.model, "starting generation stream");

    let payload = GenerateRequest {
        model: request.model,
        prompt: request.prompt,
        stream: true,
        options: GenerateOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        },
        system: request.system_prompt.filter(|s| !s.is_empty()),
    };
    let generate_url = construct_api_url(&base_url, "api/generate");

    let opened = tokio::select! {
        result = net::open_stream(&client, &generate_url, &payload, idle_timeout) => result,
        _ = cancel.cancelled() => {
            let _ = tx.send(GenerationEvent::Cancelled);
            return;
        }
    };

    let mut lines = match opened {
        Ok(lines) => lines,
        Err(err) => {
            warn!(error = %err, "generation request failed");
            let _ = tx.send(GenerationEvent::Failed(err.to_string()));
            return;
        }
    };

    loop {
        // Dropping `lines` on the cancelled branch closes the connection,
        // which also unblocks any read the server was never going to answer.
        let line = tokio::select! {
            result = lines.next_line() => result,
            _ = cancel.cancelled() => {
                let _ = tx.send(GenerationEvent::Cancelled);
                return;
            }
        };

        match line {
            Ok(Some(line)) => match serde_json::from_str::<GenerateChunk>(&line) {
                Ok(chunk) => {
                    if let Some(token) = chunk.response {
                        lock_transcript(&transcript).push_str(&token);
                        let _ = tx.send(GenerationEvent::Token(token));
                    }
                    if chunk.done {
                        let _ = tx.send(GenerationEvent::Completed);
                        return;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "malformed generation line");
                    let _ = tx.send(GenerationEvent::Failed(
                        ApiError::Parse(err.to_string()).to_string(),
                    ));
                    return;
                }
            },
            // Stream ended without a done marker; treat it as completion, the
            // same way the server's own clients do.
            Ok(None) => {
                let _ = tx.send(GenerationEvent::Completed);
                return;
            }
            Err(err) => {
                let _ = tx.send(GenerationEvent::Failed(err.to_string()));
                return;
            }
        }
    }
}
