//! OpenAI-compatible Chat Completions and Embeddings provider
//!
//! Compressa, OpenAI and Ollama all expose this dialect, so one client
//! covers every preset in [`crate::models`].

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    providers::LlmProvider,
    stream::{MessageEvent, MessageEventStream},
    types::{AssistantMetadata, CompletionOptions, Message, Model, StopReason, Usage},
};

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenAIProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    /// Create a provider for endpoints that need no credentials (e.g. Ollama)
    pub fn anonymous() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
        }
    }

    /// Replace the HTTP client with one that applies a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn post(&self, url: &str, model: &Model) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).header("content-type", "application/json");
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }
        for (key, value) in &model.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder
    }

    /// Embed a batch of texts with the `/embeddings` endpoint. Vectors are
    /// returned in input order.
    pub async fn embed(&self, model: &Model, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }

        let url = endpoint(model, "embeddings")?;
        let request = EmbeddingRequest {
            model: &model.id,
            input: inputs,
        };

        let response = self.post(&url, model).json(&request).send().await?;
        let response = check_status(response).await?;
        let body: EmbeddingResponse = response.json().await?;

        let mut data = body.data;
        if data.len() != inputs.len() {
            return Err(Error::UnexpectedResponse(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(
        &self,
        model: &Model,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message> {
        let request = build_request(model, messages, options, false);
        let url = endpoint(model, "chat/completions")?;

        tracing::debug!(model = %model.id, messages = messages.len(), "chat completion request");

        let response = self.post(&url, model).json(&request).send().await?;
        let response = check_status(response).await?;
        let body: ChatResponse = response.json().await?;

        parse_response(body, model)
    }

    async fn stream(
        &self,
        model: &Model,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<MessageEventStream> {
        let request = build_request(model, messages, options, true);
        let url = endpoint(model, "chat/completions")?;

        let request_builder = self.post(&url, model).json(&request);
        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source, model.clone())))
    }
}

fn endpoint(model: &Model, path: &str) -> Result<String> {
    if model.base_url.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "model {} has no base URL",
            model.id
        )));
    }
    Ok(format!("{}/{}", model.base_url, path))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let text = response.text().await.unwrap_or_default();
    Err(Error::from_status(status, text, retry_after))
}

fn build_request(
    model: &Model,
    messages: &[Message],
    options: &CompletionOptions,
    stream: bool,
) -> ChatRequest {
    ChatRequest {
        model: model.id.clone(),
        messages: messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role().to_string(),
                content: m.text().to_string(),
            })
            .collect(),
        stream,
        max_tokens: options.max_tokens,
        temperature: options.temperature,
    }
}

fn parse_response(body: ChatResponse, model: &Model) -> Result<Message> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("response has no choices".to_string()))?;

    let usage = body
        .usage
        .map(|u| Usage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Message::Assistant {
        content: choice.message.content.unwrap_or_default(),
        metadata: AssistantMetadata {
            provider: Some(model.provider),
            model: Some(model.id.clone()),
            usage,
            stop_reason: StopReason::from_finish_reason(choice.finish_reason.as_deref()),
            timestamp: chrono::Utc::now().timestamp_millis(),
        },
    })
}

fn create_stream(
    mut event_source: EventSource,
    model: Model,
) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulated_text = String::new();
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        let start_message = Message::Assistant {
            content: String::new(),
            metadata: AssistantMetadata {
                provider: Some(model.provider),
                model: Some(model.id.clone()),
                ..Default::default()
            },
        };
        yield MessageEvent::Start { message: start_message };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match serde_json::from_str::<StreamChunk>(&msg.data) {
                        Ok(chunk) => {
                            for choice in &chunk.choices {
                                if let Some(ref content) = choice.delta.content {
                                    accumulated_text.push_str(content);
                                    yield MessageEvent::TextDelta { delta: content.clone() };
                                }
                                if let Some(ref reason) = choice.finish_reason {
                                    finish_reason = Some(reason.clone());
                                }
                            }

                            if let Some(ref stream_usage) = chunk.usage {
                                usage.input = stream_usage.prompt_tokens;
                                usage.output = stream_usage.completion_tokens;
                            }
                        }
                        Err(e) => {
                            yield MessageEvent::Error {
                                message: format!("Failed to parse chunk: {}", e),
                            };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield MessageEvent::Error {
                        message: format!("SSE error: {}", e),
                    };
                    return;
                }
            }
        }
        event_source.close();

        let stop_reason = StopReason::from_finish_reason(finish_reason.as_deref());
        let final_message = Message::Assistant {
            content: accumulated_text,
            metadata: AssistantMetadata {
                provider: Some(model.provider),
                model: Some(model.id.clone()),
                usage: usage.clone(),
                stop_reason,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        };

        yield MessageEvent::Done {
            message: final_message,
            stop_reason: stop_reason.unwrap_or(StopReason::Stop),
            usage,
        };
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

// Streaming response types

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
