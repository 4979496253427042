use std::time::Duration;

use thiserror::Error;

/// Errors produced while talking to the Ollama server.
///
/// `ConnectionRefused` is kept separate from other transport faults because it
/// almost always means the server process is not running, and the user-facing
/// message should say so.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not connect to the Ollama server (is `ollama serve` running?)")]
    ConnectionRefused,

    #[error("network error: {0}")]
    Transport(String),

    #[error("malformed response from server: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    Validation(String),

    /// Only raised when an idle-read timeout has been configured; the default
    /// behavior is to wait indefinitely, like the server's own clients do.
    #[error("no data received from server for {0:?}")]
    IdleTimeout(Duration),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ApiError::ConnectionRefused
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_refused_mentions_the_server() {
        let message = ApiError::ConnectionRefused.to_string();
        assert!(message.contains("ollama serve"));
    }

    #[test]
    fn idle_timeout_reports_the_limit() {
        let message = ApiError::IdleTimeout(Duration::from_secs(30)).to_string();
        assert!(message.contains("30s"));
    }
}
