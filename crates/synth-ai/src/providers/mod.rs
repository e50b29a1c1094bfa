//! LLM Provider implementations

pub mod openai;

use crate::{CompletionOptions, Message, MessageEventStream, Model, Result};
use async_trait::async_trait;

/// Trait for chat-completion providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a complete response in one round trip
    async fn complete(
        &self,
        model: &Model,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message>;

    /// Stream a response from the LLM
    async fn stream(
        &self,
        model: &Model,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<MessageEventStream>;
}
