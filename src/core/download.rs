//! Model downloads against `/api/pull`.
//!
//! Shaped like the generation task, but each event is a standalone progress
//! report rather than a fragment of accumulating text. A download may run
//! alongside a generation task; neither limits the other.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{PullChunk, PullRequest};
use crate::core::error::ApiError;
use crate::core::net;
use crate::utils::url::construct_api_url;

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// A fresh status report. `percent` is only present while the server
    /// reports byte counts for a transferring layer.
    Progress {
        status: String,
        percent: Option<f64>,
    },
    Completed,
    Failed(String),
}

pub struct DownloadParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub model_name: String,
    pub idle_timeout: Option<Duration>,
}

pub struct DownloadHandle {
    events: mpsc::UnboundedReceiver<DownloadEvent>,
    cancel: CancellationToken,
}

impl DownloadHandle {
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    /// Abandon the download. The connection closes immediately and no
    /// further events are delivered; the server keeps whatever layers it
    /// already pulled, so a later retry resumes cheaply.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Start pulling a model. An empty name fails immediately, before any
/// request is issued.
pub fn spawn_download(params: DownloadParams) -> DownloadHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let worker_cancel = cancel.clone();
    tokio::spawn(async move {
        run_download(params, tx, worker_cancel).await;
    });

    DownloadHandle { events: rx, cancel }
}

async fn run_download(
    params: DownloadParams,
    tx: mpsc::UnboundedSender<DownloadEvent>,
    cancel: CancellationToken,
) {
    let DownloadParams {
        client,
        base_url,
        model_name,
        idle_timeout,
    } = params;

    if model_name.trim().is_empty() {
        let _ = tx.send(DownloadEvent::Failed(
            ApiError::Validation("empty model name".to_string()).to_string(),
        ));
        return;
    }

    debug!(model = %model_name, "starting model pull");

    let payload = PullRequest {
        name: model_name,
        stream: true,
    };
    let pull_url = construct_api_url(&base_url, "api/pull");

    let opened = tokio::select! {
        result = net::open_stream(&client, &pull_url, &payload, idle_timeout) => result,
        _ = cancel.cancelled() => return,
    };

    let mut lines = match opened {
        Ok(lines) => lines,
        Err(err) => {
            warn!(error = %err, "pull request failed");
            let _ = tx.send(DownloadEvent::Failed(err.to_string()));
            return;
        }
    };

    loop {
        let line = tokio::select! {
            result = lines.next_line() => result,
            _ = cancel.cancelled() => return,
        };

        match line {
            Ok(Some(line)) => match serde_json::from_str::<PullChunk>(&line) {
                Ok(chunk) => {
                    if chunk.status == "success" {
                        let _ = tx.send(DownloadEvent::Completed);
                        return;
                    }
                    let percent = percent_of(&chunk);
                    let _ = tx.send(DownloadEvent::Progress {
                        status: chunk.status,
                        percent,
                    });
                }
                Err(err) => {
                    warn!(error = %err, "malformed pull line");
                    let _ = tx.send(DownloadEvent::Failed(
                        ApiError::Parse(err.to_string()).to_string(),
                    ));
                    return;
                }
            },
            Ok(None) => {
                let _ = tx.send(DownloadEvent::Completed);
                return;
            }
            Err(err) => {
                let _ = tx.send(DownloadEvent::Failed(err.to_string()));
                return;
            }
        }
    }
}

/// Percentage for a transferring layer; omitted when the server reports no
/// byte counts or a zero total.
fn percent_of(chunk: &PullChunk) -> Option<f64> {
    match (chunk.total, chunk.completed) {
        (Some(total), Some(completed)) if total > 0 => {
            Some(completed as f64 / total as f64 * 100.0)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{refused_url, serve_once};

    fn params(base_url: &str, model_name: &str) -> DownloadParams {
        DownloadParams {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            model_name: model_name.to_string(),
            idle_timeout: None,
        }
    }

    #[test]
    fn percent_is_a_ratio_of_completed_to_total() {
        let chunk: PullChunk =
            serde_json::from_str(r#"{"status":"downloading","total":200,"completed":50}"#)
                .expect("parse");
        assert_eq!(percent_of(&chunk), Some(25.0));
    }

    #[test]
    fn zero_total_omits_the_percentage() {
        let chunk: PullChunk =
            serde_json::from_str(r#"{"status":"verifying","total":0,"completed":0}"#)
                .expect("parse");
        assert_eq!(percent_of(&chunk), None);
    }

    #[tokio::test]
    async fn reports_progress_then_completes_on_success_status() {
        let body = concat!(
            "{\"status\":\"pulling manifest\"}\n",
            "{\"status\":\"downloading\",\"total\":200,\"completed\":50}\n",
            "{\"status\":\"success\"}\n",
        );
        let server = serve_once(body.to_string(), false).await;
        let mut handle = spawn_download(params(&server.base_url, "llama3.2"));

        assert_eq!(
            handle.next_event().await,
            Some(DownloadEvent::Progress {
                status: "pulling manifest".to_string(),
                percent: None,
            })
        );
        assert_eq!(
            handle.next_event().await,
            Some(DownloadEvent::Progress {
                status: "downloading".to_string(),
                percent: Some(25.0),
            })
        );
        assert_eq!(handle.next_event().await, Some(DownloadEvent::Completed));
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn stream_end_without_success_status_still_completes() {
        let body = "{\"status\":\"pulling manifest\"}\n";
        let server = serve_once(body.to_string(), false).await;
        let mut handle = spawn_download(params(&server.base_url, "llama3.2"));

        assert!(matches!(
            handle.next_event().await,
            Some(DownloadEvent::Progress { .. })
        ));
        assert_eq!(handle.next_event().await, Some(DownloadEvent::Completed));
    }

    #[tokio::test]
    async fn empty_model_name_fails_without_a_network_call() {
        let server = serve_once(String::new(), false).await;
        let mut handle = spawn_download(params(&server.base_url, "   "));

        match handle.next_event().await {
            Some(DownloadEvent::Failed(message)) => {
                assert!(message.contains("empty model name"), "got: {message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(handle.next_event().await, None);
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn connection_refused_maps_to_the_server_guidance() {
        let mut handle = spawn_download(params(&refused_url().await, "llama3.2"));

        match handle.next_event().await {
            Some(DownloadEvent::Failed(message)) => {
                assert!(message.contains("could not connect"), "got: {message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn cancel_ends_the_stream_without_further_events() {
        let body = "{\"status\":\"downloading\",\"total\":100,\"completed\":10}\n";
        let server = serve_once(body.to_string(), true).await;
        let mut handle = spawn_download(params(&server.base_url, "llama3.2"));

        assert!(matches!(
            handle.next_event().await,
            Some(DownloadEvent::Progress { .. })
        ));
        handle.cancel();
        assert_eq!(handle.next_event().await, None);
    }
}
