//! Error types for synth-ai

use serde::Deserialize;
use thiserror::Error;

/// Result type alias using synth-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the completion and embedding endpoints
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// `{"error": {"message": ...}}`, the OpenAI-compatible error body
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl Error {
    /// Map a non-success status and response body to an error. The message
    /// is taken from a JSON error body when there is one.
    pub fn from_status(status: reqwest::StatusCode, body: String, retry_after: Option<u64>) -> Self {
        match status.as_u16() {
            401 | 403 => Error::InvalidApiKey,
            429 => Error::RateLimited { retry_after },
            code => {
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|b| b.error.message)
                    .unwrap_or(body);
                Error::Api {
                    status: code,
                    message,
                }
            }
        }
    }

    /// Transient failures worth another attempt: transport errors, rate
    /// limits, dropped streams and server-side (5xx) errors
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::RateLimited { .. } | Error::Sse(_) => true,
            Error::Api { status, message } => {
                *status >= 500 || message.to_lowercase().contains("overloaded")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            Error::from_status(StatusCode::UNAUTHORIZED, String::new(), None),
            Error::InvalidApiKey
        ));
        assert!(matches!(
            Error::from_status(StatusCode::TOO_MANY_REQUESTS, String::new(), Some(3)),
            Error::RateLimited {
                retry_after: Some(3)
            }
        ));
    }

    #[test]
    fn test_json_error_body_message() {
        let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error"}}"#;
        let e = Error::from_status(StatusCode::NOT_FOUND, body.into(), None);
        assert_eq!(e.to_string(), "API error 404: model not found");
    }

    #[test]
    fn test_plain_error_body_kept() {
        let e = Error::from_status(StatusCode::BAD_GATEWAY, "upstream down".into(), None);
        assert_eq!(e.to_string(), "API error 502: upstream down");
        assert!(e.is_retryable());
    }

    #[test]
    fn test_retryable_variants() {
        assert!(Error::RateLimited { retry_after: None }.is_retryable());
        assert!(Error::Sse("connection reset".into()).is_retryable());
        assert!(
            Error::Api {
                status: 400,
                message: "Model is overloaded".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_not_retryable_client_errors() {
        let e = Error::from_status(StatusCode::BAD_REQUEST, "bad field".into(), None);
        assert!(!e.is_retryable());
        assert!(!Error::InvalidApiKey.is_retryable());
        assert!(!Error::InvalidConfig("no base url".into()).is_retryable());
    }
}
