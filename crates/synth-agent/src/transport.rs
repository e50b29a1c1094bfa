//! Transport abstraction between the agents and a completion provider

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use synth_ai::{CompletionOptions, LlmProvider, Message, Model, Result, stream::collect_message};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts. Zero disables retries.
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Per-agent request configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Model to use
    pub model: Model,
    /// Temperature
    pub temperature: Option<f32>,
    /// Maximum tokens per response
    pub max_tokens: Option<u32>,
}

impl RunConfig {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions::new(self.temperature, self.max_tokens)
    }
}

/// Text-completion capability used by both agents
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the full history and return the model's reply
    async fn complete(&self, messages: &[Message], config: &RunConfig) -> Result<Message>;
}

/// Direct provider transport - calls the completion API, optionally
/// streaming, with retries on transient failures
pub struct ProviderTransport {
    provider: Arc<dyn LlmProvider>,
    retry_config: RetryConfig,
    stream: bool,
}

impl ProviderTransport {
    /// Create a new provider transport
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            retry_config: RetryConfig::default(),
            stream: false,
        }
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Use server-sent events instead of a single JSON response
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    async fn attempt(&self, messages: &[Message], config: &RunConfig) -> Result<Message> {
        let options = config.options();
        if self.stream {
            let events = self.provider.stream(&config.model, messages, &options).await?;
            collect_message(events).await
        } else {
            self.provider.complete(&config.model, messages, &options).await
        }
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn complete(&self, messages: &[Message], config: &RunConfig) -> Result<Message> {
        let mut attempt = 0u32;
        loop {
            match self.attempt(messages, config).await {
                Ok(message) => return Ok(message),
                Err(e) if e.is_retryable() && attempt < self.retry_config.max_retries => {
                    let delay = self.retry_config.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt + 1,
                        self.retry_config.max_retries + 1,
                        e,
                        delay
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use synth_ai::{Error, MessageEventStream, Provider, models};

    pub(crate) fn test_model() -> Model {
        models::resolve_model(Provider::Custom, Some("test"), Some("http://localhost"))
    }

    /// A mock transport that replays canned replies and records every
    /// request it receives.
    pub(crate) struct MockTransport {
        responses: Mutex<Vec<String>>,
        fallback: String,
        pub(crate) requests: Mutex<Vec<Vec<Message>>>,
    }

    impl MockTransport {
        pub(crate) fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                fallback: "ok".to_string(),
                requests: Mutex::new(vec![]),
            }
        }

        pub(crate) fn always(reply: &str) -> Self {
            Self {
                responses: Mutex::new(vec![]),
                fallback: reply.to_string(),
                requests: Mutex::new(vec![]),
            }
        }

        pub(crate) fn last_request(&self) -> Vec<Message> {
            self.requests.lock().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn complete(&self, messages: &[Message], _config: &RunConfig) -> Result<Message> {
            self.requests.lock().push(messages.to_vec());
            let text = {
                let mut responses = self.responses.lock();
                if responses.is_empty() {
                    self.fallback.clone()
                } else {
                    responses.remove(0)
                }
            };
            Ok(Message::assistant(text))
        }
    }

    /// Provider that fails a fixed number of times before answering
    struct FlakyProvider {
        failures_left: Mutex<u32>,
        error: fn() -> Error,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn complete(
            &self,
            _model: &Model,
            _messages: &[Message],
            _options: &CompletionOptions,
        ) -> Result<Message> {
            *self.calls.lock() += 1;
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err((self.error)());
            }
            Ok(Message::assistant("recovered"))
        }

        async fn stream(
            &self,
            _model: &Model,
            _messages: &[Message],
            _options: &CompletionOptions,
        ) -> Result<MessageEventStream> {
            Err(Error::Sse("streaming not supported in test".into()))
        }
    }

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_no_retries_by_default() {
        let provider = Arc::new(FlakyProvider {
            failures_left: Mutex::new(1),
            error: || Error::RateLimited { retry_after: None },
            calls: Mutex::new(0),
        });
        let transport = ProviderTransport::new(provider.clone());
        let result = transport.complete(&[], &RunConfig::new(test_model())).await;
        assert!(result.is_err());
        assert_eq!(*provider.calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_retryable_error_is_retried() {
        let provider = Arc::new(FlakyProvider {
            failures_left: Mutex::new(2),
            error: || Error::RateLimited { retry_after: None },
            calls: Mutex::new(0),
        });
        let transport = ProviderTransport::new(provider.clone()).with_retry_config(fast_retries(3));
        let reply = transport.complete(&[], &RunConfig::new(test_model())).await.unwrap();
        assert_eq!(reply.text(), "recovered");
        assert_eq!(*provider.calls.lock(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let provider = Arc::new(FlakyProvider {
            failures_left: Mutex::new(1),
            error: || Error::InvalidApiKey,
            calls: Mutex::new(0),
        });
        let transport = ProviderTransport::new(provider.clone()).with_retry_config(fast_retries(3));
        let result = transport.complete(&[], &RunConfig::new(test_model())).await;
        assert!(matches!(result, Err(Error::InvalidApiKey)));
        assert_eq!(*provider.calls.lock(), 1);
    }
}
