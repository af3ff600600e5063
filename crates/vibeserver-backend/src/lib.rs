//! Model session backed by an OpenAI-compatible completion server.
//!
//! Works against anything that serves `/v1/models` and a streaming
//! `/v1/chat/completions`: llama-server, Ollama's OpenAI endpoint, vLLM.
//! The session is established once at startup, then shared by all requests
//! through [`vibeserver_core::CompletionPort`].

pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod sse;

pub use config::BackendConfig;
pub use error::{BackendError, BackendResult};
pub use session::ModelSession;
pub use sse::sse_fragments;
