//! Charla is a terminal chat client for a locally-running Ollama server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the streaming pipeline: the generation and download tasks,
//!   NDJSON line reading and decoding, session persistence, and configuration.
//! - [`api`] defines the wire payloads for the server's HTTP API plus thin
//!   wrappers over the non-streaming endpoints (model listing and deletion).
//! - [`cli`] parses command-line arguments and runs the interactive chat loop
//!   and the model-management subcommands.
//! - [`utils`] holds URL normalization and transcript-logging helpers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
