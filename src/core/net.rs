//! Incremental NDJSON line reading over a streaming HTTP response.
//!
//! The response body is consumed chunk by chunk as the server emits it; lines
//! are carved out of a rolling buffer as soon as their newline arrives, so
//! tokens reach the consumer without waiting for the body to finish.

use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use serde::Serialize;

use crate::core::error::ApiError;

pub type BodyStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

/// Splits a byte stream into trimmed, non-blank lines. Blank lines are server
/// keep-alives and are skipped.
pub struct LineStream<S> {
    inner: S,
    buffer: Vec<u8>,
    idle_timeout: Option<Duration>,
}

impl<S, B, E> LineStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ApiError>,
{
    pub fn new(inner: S, idle_timeout: Option<Duration>) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            idle_timeout,
        }
    }

    /// Next non-blank line, or `Ok(None)` once the body is exhausted.
    pub async fn next_line(&mut self) -> Result<Option<String>, ApiError> {
        loop {
            if let Some(line) = take_line(&mut self.buffer)? {
                return Ok(Some(line));
            }

            let chunk = match self.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, self.inner.next()).await {
                    Ok(chunk) => chunk,
                    Err(_) => return Err(ApiError::IdleTimeout(limit)),
                },
                None => self.inner.next().await,
            };

            match chunk {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(err)) => return Err(err.into()),
                None => {
                    // Trailing data without a final newline still counts as a line.
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let rest = std::mem::take(&mut self.buffer);
                    let line = String::from_utf8(rest)
                        .map_err(|err| ApiError::Parse(err.to_string()))?;
                    let line = line.trim();
                    return if line.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some(line.to_string()))
                    };
                }
            }
        }
    }
}

fn take_line(buffer: &mut Vec<u8>) -> Result<Option<String>, ApiError> {
    while let Some(newline_pos) = memchr(b'\n', buffer) {
        let raw: Vec<u8> = buffer.drain(..=newline_pos).collect();
        let line = std::str::from_utf8(&raw[..newline_pos])
            .map_err(|err| ApiError::Parse(err.to_string()))?
            .trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
    Ok(None)
}

/// Issue a streaming POST and hand back its body as a line stream.
///
/// A refused connection maps to [`ApiError::ConnectionRefused`]; a non-2xx
/// status is reported with whatever body the server attached.
pub async fn open_stream<T>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
    idle_timeout: Option<Duration>,
) -> Result<LineStream<BodyStream>, ApiError>
where
    T: Serialize + ?Sized,
{
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(ApiError::from)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(ApiError::Transport(format!(
            "server returned {status}: {error_text}"
        )));
    }

    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
        .boxed();
    Ok(LineStream::new(body, idle_timeout))
}
