//! Shared constants used across the application

/// Base URL of a locally-running Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Sampling temperature used when the config does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Response length cap (`num_predict`) used when the config does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
