//! Core types for LLM interactions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Known chat-completion providers. All of them speak the OpenAI
/// `/chat/completions` dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Compressa,
    OpenAI,
    Ollama,
    Custom,
}

impl Provider {
    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Compressa => "Compressa",
            Provider::OpenAI => "OpenAI",
            Provider::Ollama => "Ollama",
            Provider::Custom => "Custom",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Provider::Compressa => Some("API_COMPRESSA_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Ollama => None,
            Provider::Custom => None,
        }
    }

    /// Default base URL for the provider's OpenAI-compatible API
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Compressa => "https://compressa-api.mil-team.ru/v1",
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::Custom => "",
        }
    }

    /// Parse a provider from a config string. Unknown names map to `Custom`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "compressa" => Provider::Compressa,
            "openai" => Provider::OpenAI,
            "ollama" => Provider::Ollama,
            _ => Provider::Custom,
        }
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier sent in the request body
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Provider
    pub provider: Provider,
    /// Base URL for API calls (without the `/chat/completions` suffix)
    pub base_url: String,
    /// Additional headers for API calls
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    Stop,
    /// Maximum tokens reached
    Length,
    /// Content filter or other provider-side stop
    Filtered,
}

impl StopReason {
    pub(crate) fn from_finish_reason(reason: Option<&str>) -> Option<Self> {
        match reason {
            Some("stop") => Some(StopReason::Stop),
            Some("length") => Some(StopReason::Length),
            Some("content_filter") => Some(StopReason::Filtered),
            _ => None,
        }
    }
}

/// A single conversation message. System messages may appear anywhere in
/// the history, not only at the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// Instruction from the operator
    System {
        content: String,
        #[serde(default)]
        timestamp: i64,
    },
    /// Human turn
    User {
        content: String,
        #[serde(default)]
        timestamp: i64,
    },
    /// Model response
    Assistant {
        content: String,
        #[serde(flatten)]
        metadata: AssistantMetadata,
    },
}

/// Metadata for assistant messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantMetadata {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Usage,
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self::System {
            content: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an assistant message without provider metadata
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: text.into(),
            metadata: AssistantMetadata {
                timestamp: chrono::Utc::now().timestamp_millis(),
                ..Default::default()
            },
        }
    }

    /// Get the role as the wire string
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
        }
    }

    /// Get the text content
    pub fn text(&self) -> &str {
        match self {
            Self::System { content, .. } => content,
            Self::User { content, .. } => content,
            Self::Assistant { content, .. } => content,
        }
    }

    /// Usage reported for an assistant message, if any
    pub fn usage(&self) -> Option<&Usage> {
        match self {
            Self::Assistant { metadata, .. } => Some(&metadata.usage),
            _ => None,
        }
    }
}

/// Sampling options for a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    pub fn new(temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roles_and_text() {
        assert_eq!(Message::system("be brief").role(), "system");
        assert_eq!(Message::user("hi").role(), "user");
        let reply = Message::assistant("hello");
        assert_eq!(reply.role(), "assistant");
        assert_eq!(reply.text(), "hello");
        assert_eq!(reply.usage(), Some(&Usage::default()));
        assert!(Message::user("hi").usage().is_none());
    }

    #[test]
    fn test_message_serde_tagging() {
        let json = serde_json::to_value(Message::user("one burger")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "one burger");
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("Compressa"), Provider::Compressa);
        assert_eq!(Provider::parse(" openai "), Provider::OpenAI);
        assert_eq!(Provider::parse("somewhere-else"), Provider::Custom);
        assert_eq!(Provider::Compressa.api_key_env_var(), Some("API_COMPRESSA_KEY"));
    }
}
