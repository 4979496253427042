//! Wire payloads for the Ollama HTTP API.
//!
//! Streaming endpoints (`/api/generate`, `/api/pull`) respond with
//! newline-delimited JSON; the chunk types here describe one line each.

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub num_predict: u32,
}

/// One line of a `/api/generate` stream. The final line carries
/// `done: true` and usually no `response` fragment.
#[derive(Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Serialize)]
pub struct PullRequest {
    pub name: String,
    pub stream: bool,
}

/// One line of a `/api/pull` stream. `total` and `completed` are only
/// present while a layer is actually transferring.
#[derive(Deserialize)]
pub struct PullChunk {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
}

#[derive(Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Deserialize)]
pub struct TagsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Serialize)]
pub struct DeleteRequest {
    pub name: String,
}

pub mod models;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_chunk_tolerates_missing_fields() {
        let chunk: GenerateChunk = serde_json::from_str(r#"{"done":true}"#).expect("parse");
        assert!(chunk.response.is_none());
        assert!(chunk.done);

        let chunk: GenerateChunk =
            serde_json::from_str(r#"{"response":"Hi","done":false,"model":"llama3.2"}"#)
                .expect("parse");
        assert_eq!(chunk.response.as_deref(), Some("Hi"));
        assert!(!chunk.done);
    }

    #[test]
    fn pull_chunk_defaults_progress_fields() {
        let chunk: PullChunk =
            serde_json::from_str(r#"{"status":"pulling manifest"}"#).expect("parse");
        assert_eq!(chunk.status, "pulling manifest");
        assert!(chunk.total.is_none());
        assert!(chunk.completed.is_none());
    }

    #[test]
    fn generate_request_omits_empty_system_prompt() {
        let request = GenerateRequest {
            model: "llama3.2".into(),
            prompt: "hi".into(),
            stream: true,
            options: GenerateOptions {
                temperature: 0.7,
                num_predict: 2000,
            },
            system: None,
        };
        let json = serde_json::to_string(&request).expect("serialize");
        assert!(!json.contains("system"));
        assert!(json.contains(r#""num_predict":2000"#));
    }
}
