//! The LLM capability used by the summarization pipeline.
//!
//! The pipeline only ever sees [`LanguageModel`]: a prompt goes in, text or a
//! [`RemoteModelError`] comes out. Provider adapters translate their wire formats and HTTP
//! failures into that shape so nothing provider-specific leaks into the processing layer.

mod ollama;
mod openai;

pub use ollama::OllamaModel;
pub use openai::OpenAiChatModel;

use crate::config::{ConfigError, SummarizationProvider, SummarizerSettings};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by an LLM backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteModelError {
    /// Credential was missing, invalid, or lacked permission.
    #[error("Authentication with the model provider failed: {0}")]
    Auth(String),
    /// The request did not complete in time.
    #[error("Model request timed out: {0}")]
    Timeout(String),
    /// The provider refused the request because of rate limits or exhausted quota.
    #[error("Model provider quota exceeded: {0}")]
    Quota(String),
    /// Provider was unreachable or the endpoint does not exist.
    #[error("Summarization provider unavailable: {0}")]
    Unavailable(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider returned any other error response.
    #[error("Failed to generate summary: {0}")]
    Generation(String),
}

impl RemoteModelError {
    /// Short machine-readable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Timeout(_) => "timeout",
            Self::Quota(_) => "quota",
            Self::Unavailable(_) => "unavailable",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Generation(_) => "generation",
        }
    }
}

/// Interface implemented by LLM backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` and return the model's text output.
    async fn complete(&self, prompt: &str) -> Result<String, RemoteModelError>;

    /// Human-readable identifier of the backend and model, used in logs.
    fn describe(&self) -> String;
}

/// Build the language model selected by `settings`.
///
/// The OpenAI provider requires `settings.api_key`; the Ollama provider needs no credential.
pub fn build_language_model(
    settings: &SummarizerSettings,
) -> Result<Arc<dyn LanguageModel>, ConfigError> {
    let http = build_http_client(settings.request_timeout)?;
    match settings.provider {
        SummarizationProvider::OpenAI => {
            let api_key = settings.api_key.clone().ok_or_else(|| {
                ConfigError::MissingVariable(
                    "OPENAI_API_KEY (no OpenAI API key provided)".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiChatModel::new(
                http,
                settings.base_url.clone(),
                api_key,
                settings.model.clone(),
                settings.temperature,
            )))
        }
        SummarizationProvider::Ollama => Ok(Arc::new(OllamaModel::new(
            http,
            settings.base_url.clone(),
            settings.model.clone(),
            settings.temperature,
        ))),
    }
}

fn build_http_client(timeout: Option<Duration>) -> Result<Client, ConfigError> {
    let mut builder = Client::builder().user_agent("rusty-summary/llm");
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|error| ConfigError::HttpClient(error.to_string()))
}

/// Map an unsuccessful HTTP status onto the error taxonomy.
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> RemoteModelError {
    let detail = format!("{provider} returned {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteModelError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
            RemoteModelError::Quota(detail)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RemoteModelError::Timeout(detail)
        }
        StatusCode::NOT_FOUND | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            RemoteModelError::Unavailable(detail)
        }
        _ => RemoteModelError::Generation(detail),
    }
}

/// Map a transport failure onto the error taxonomy.
pub(crate) fn classify_transport(provider: &str, target: &str, error: reqwest::Error) -> RemoteModelError {
    if error.is_timeout() {
        RemoteModelError::Timeout(format!("{provider} at {target} did not respond: {error}"))
    } else {
        RemoteModelError::Unavailable(format!("failed to reach {provider} at {target}: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_error_kinds() {
        let cases = [
            (StatusCode::UNAUTHORIZED, "auth"),
            (StatusCode::FORBIDDEN, "auth"),
            (StatusCode::TOO_MANY_REQUESTS, "quota"),
            (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            (StatusCode::NOT_FOUND, "unavailable"),
            (StatusCode::INTERNAL_SERVER_ERROR, "generation"),
        ];
        for (status, kind) in cases {
            assert_eq!(classify_status("Test", status, "body").kind(), kind, "{status}");
        }
    }

    #[test]
    fn openai_requires_api_key() {
        let settings = SummarizerSettings::default();
        let error = build_language_model(&settings)
            .err()
            .expect("missing key should fail");
        assert!(matches!(error, ConfigError::MissingVariable(name) if name.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn ollama_builds_without_credentials() {
        let settings = SummarizerSettings {
            provider: SummarizationProvider::Ollama,
            model: "llama3.1".into(),
            ..SummarizerSettings::default()
        };
        let model = build_language_model(&settings).expect("ollama model");
        assert!(model.describe().contains("llama3.1"));
    }
}
