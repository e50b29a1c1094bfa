//! synth-ai: chat-completion and embedding provider layer
//!
//! This crate provides the message types and the OpenAI-compatible client
//! used by the dialog agents, plus embedding providers for menu retrieval.

pub mod embedding;
pub mod error;
pub mod models;
pub mod providers;
pub mod stream;
pub mod types;

pub use embedding::{EmbeddingProvider, HashingEmbedder, RemoteEmbedder, cosine_similarity};
pub use error::{Error, Result};
pub use providers::{LlmProvider, openai::OpenAIProvider};
pub use stream::MessageEventStream;
pub use types::*;
