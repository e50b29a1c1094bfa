//! Streaming event types and utilities

use crate::error::{Error, Result};
use crate::types::{AssistantMetadata, Message, StopReason, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted during message streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Initial message structure
    Start { message: Message },
    /// Text content delta
    TextDelta { delta: String },
    /// Message completed successfully
    Done {
        message: Message,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred
    Error { message: String },
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }

    /// Get the final message if this is a Done event
    pub fn into_message(self) -> Option<Message> {
        match self {
            MessageEvent::Done { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// Builder for constructing an assistant message from streaming events
#[derive(Debug, Default)]
pub struct MessageBuilder {
    text: String,
    metadata: AssistantMetadata,
    done: Option<Message>,
}

impl MessageBuilder {
    /// Create a new message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming event and update the message state
    pub fn process_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::Start { message } => {
                if let Message::Assistant { metadata, .. } = message {
                    self.metadata = metadata.clone();
                }
            }
            MessageEvent::TextDelta { delta } => self.text.push_str(delta),
            MessageEvent::Done {
                message,
                stop_reason,
                usage,
            } => {
                self.metadata.stop_reason = Some(*stop_reason);
                self.metadata.usage = usage.clone();
                self.done = Some(message.clone());
            }
            MessageEvent::Error { .. } => {}
        }
    }

    /// Text received so far
    pub fn current_text(&self) -> &str {
        &self.text
    }

    /// Build the final message. A `Done` message from the provider wins over
    /// the accumulated deltas.
    pub fn build(self) -> Message {
        if let Some(message) = self.done {
            return message;
        }
        Message::Assistant {
            content: self.text,
            metadata: AssistantMetadata {
                timestamp: chrono::Utc::now().timestamp_millis(),
                ..self.metadata
            },
        }
    }
}

/// Drain a stream into its final assistant message
pub async fn collect_message(mut stream: MessageEventStream) -> Result<Message> {
    let mut builder = MessageBuilder::new();
    let mut finished = false;

    while let Some(event) = stream.next().await {
        if let MessageEvent::Error { message } = &event {
            return Err(Error::Sse(message.clone()));
        }
        finished |= event.is_terminal();
        builder.process_event(&event);
    }

    if !finished {
        tracing::warn!(
            "Stream ended without a done event after {} chars",
            builder.current_text().len()
        );
    }
    Ok(builder.build())
}
