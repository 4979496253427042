pub mod config;
pub mod constants;
pub mod download;
pub mod error;
pub mod generation;
pub mod message;
pub mod net;
pub mod session;
