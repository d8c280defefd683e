use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Default overlap (in length units) between adjacent chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Chunks whose trimmed length falls below this many characters are never summarized.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;
/// Documents whose trimmed length falls below this many characters short-circuit as too short.
pub const DEFAULT_MIN_DOCUMENT_CHARS: usize = 100;
/// Model used with the OpenAI provider when `SUMMARIZATION_MODEL` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
/// Model used with the Ollama provider when `SUMMARIZATION_MODEL` is unset.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

/// Errors encountered while loading configuration or building clients from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// The HTTP transport for a provider could not be constructed.
    #[error("Failed to construct HTTP client: {0}")]
    HttpClient(String),
}

/// Runtime configuration for the Rusty Summary binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// LLM backend used for summarization.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the provider.
    pub summarization_model: String,
    /// API key for the OpenAI provider.
    pub openai_api_key: Option<String>,
    /// Optional override for the OpenAI-compatible base URL.
    pub openai_base_url: Option<String>,
    /// Optional override for the Ollama runtime URL.
    pub ollama_url: Option<String>,
    /// Sampling temperature requested from the model.
    pub summary_temperature: f32,
    /// Optional per-request timeout applied to every model call.
    pub summary_request_timeout_secs: Option<u64>,
    /// Optional override for the automatic chunk size selection.
    pub text_splitter_chunk_size: Option<usize>,
    /// Overlap between adjacent chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Unit used to measure chunk length.
    pub text_splitter_length_unit: LengthUnit,
    /// Minimum trimmed characters for a chunk to be summarized.
    pub summary_min_chunk_chars: usize,
    /// Minimum trimmed characters for a document to be summarized at all.
    pub summary_min_document_chars: usize,
    /// Maximum number of chunk summaries in flight at once.
    pub summary_concurrency: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported LLM backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Hosted OpenAI chat completions API (or any compatible endpoint).
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

/// How chunk sizes and overlaps are measured.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// Unicode scalar values.
    #[default]
    Characters,
    /// Model tokens as counted by `tiktoken`.
    Tokens,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value.parse().map_err(|()| {
                ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
            })?,
            None => SummarizationProvider::OpenAI,
        };
        let summarization_model = load_env_optional("SUMMARIZATION_MODEL")
            .unwrap_or_else(|| summarization_provider.default_model().to_string());

        Ok(Self {
            summarization_provider,
            summarization_model,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            summary_temperature: load_env_parsed("SUMMARY_TEMPERATURE")?.unwrap_or(0.0),
            summary_request_timeout_secs: load_env_parsed("SUMMARY_REQUEST_TIMEOUT_SECS")?,
            text_splitter_chunk_size: load_env_parsed("TEXT_SPLITTER_CHUNK_SIZE")?,
            text_splitter_chunk_overlap: load_env_parsed("TEXT_SPLITTER_CHUNK_OVERLAP")?
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            text_splitter_length_unit: match load_env_optional("TEXT_SPLITTER_LENGTH_UNIT") {
                Some(value) => value.parse().map_err(|()| {
                    ConfigError::InvalidValue("TEXT_SPLITTER_LENGTH_UNIT".to_string())
                })?,
                None => LengthUnit::Characters,
            },
            summary_min_chunk_chars: load_env_parsed("SUMMARY_MIN_CHUNK_CHARS")?
                .unwrap_or(DEFAULT_MIN_CHUNK_CHARS),
            summary_min_document_chars: load_env_parsed("SUMMARY_MIN_DOCUMENT_CHARS")?
                .unwrap_or(DEFAULT_MIN_DOCUMENT_CHARS),
            summary_concurrency: load_env_parsed("SUMMARY_CONCURRENCY")?.unwrap_or(1),
            server_port: load_env_parsed("SERVER_PORT")?,
        })
    }

    /// Derive the explicit settings handed to the summarization core.
    pub fn summarizer_settings(&self) -> SummarizerSettings {
        let base_url = match self.summarization_provider {
            SummarizationProvider::OpenAI => self.openai_base_url.clone(),
            SummarizationProvider::Ollama => self.ollama_url.clone(),
        };
        SummarizerSettings {
            provider: self.summarization_provider,
            model: self.summarization_model.clone(),
            api_key: self.openai_api_key.clone(),
            base_url,
            temperature: self.summary_temperature,
            request_timeout: self.summary_request_timeout_secs.map(Duration::from_secs),
            chunk_size: self.text_splitter_chunk_size,
            chunk_overlap: self.text_splitter_chunk_overlap,
            length_unit: self.text_splitter_length_unit,
            min_chunk_chars: self.summary_min_chunk_chars,
            min_document_chars: self.summary_min_document_chars,
            concurrency: self.summary_concurrency.max(1),
        }
    }
}

/// Settings consumed by the summarization core.
///
/// Everything the pipeline needs, credentials included, travels through this value; the core
/// never reads the process environment on its own.
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    /// LLM backend to call.
    pub provider: SummarizationProvider,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Credential for providers that require one.
    pub api_key: Option<String>,
    /// Optional endpoint override.
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional timeout applied to each model call.
    pub request_timeout: Option<Duration>,
    /// Optional fixed chunk size; derived automatically when absent.
    pub chunk_size: Option<usize>,
    /// Overlap between adjacent chunks.
    pub chunk_overlap: usize,
    /// Unit used to measure chunk length.
    pub length_unit: LengthUnit,
    /// Minimum trimmed characters for a chunk to be summarized.
    pub min_chunk_chars: usize,
    /// Minimum trimmed characters for a document to be summarized.
    pub min_document_chars: usize,
    /// Maximum number of chunk summaries in flight.
    pub concurrency: usize,
}

impl SummarizerSettings {
    /// Replace the credential when the caller supplied a non-empty one.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        self
    }

    /// Replace the chunk size when the caller supplied one.
    pub fn with_chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        if chunk_size.is_some() {
            self.chunk_size = chunk_size;
        }
        self
    }
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            provider: SummarizationProvider::OpenAI,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.0,
            request_timeout: None,
            chunk_size: None,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            length_unit: LengthUnit::Characters,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
            min_document_chars: DEFAULT_MIN_DOCUMENT_CHARS,
            concurrency: 1,
        }
    }
}

impl SummarizationProvider {
    /// Model used when none is configured explicitly.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => DEFAULT_OPENAI_MODEL,
            Self::Ollama => DEFAULT_OLLAMA_MODEL,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "characters" | "chars" => Ok(Self::Characters),
            "tokens" => Ok(Self::Tokens),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from `.env` and the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    if let Some(existing) = CONFIG.get() {
        return Ok(existing);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        chunk_size = ?config.text_splitter_chunk_size,
        length_unit = ?config.text_splitter_length_unit,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
