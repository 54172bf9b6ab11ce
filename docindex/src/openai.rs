//! OpenAI embedding provider using the OpenAI embeddings API.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{DocIndexError, Result};

const PROVIDER: &str = "OpenAI";

/// The default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// The dimensionality of `text-embedding-ada-002`.
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Connection settings for [`OpenAIEmbeddingProvider`].
///
/// Held by the provider instance; nothing is read from process-wide state
/// after construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAIEmbeddingConfig {
    /// The API key sent as a bearer token.
    pub api_key: String,
    /// Embedding model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL, without a trailing `/embeddings`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Vector length reported by the provider. Sent to the API for every
    /// model except the default one.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

impl std::fmt::Debug for OpenAIEmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddingConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl OpenAIEmbeddingConfig {
    /// Settings for the default model with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Settings from `OPENAI_API_KEY`, plus `OPENAI_BASE_URL` when set.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Config`] if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            DocIndexError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Uses `reqwest` to call the `/embeddings` endpoint directly; a batch is
/// sent as one request.
///
/// # Example
///
/// ```rust,ignore
/// use docindex::openai::{OpenAIEmbeddingConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIEmbeddingConfig::from_env()?)?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug)]
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Config`] if the API key is empty or the
    /// dimensions are zero.
    pub fn new(config: OpenAIEmbeddingConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(DocIndexError::Config("OpenAI API key must not be empty".to_string()));
        }
        if config.dimensions == 0 {
            return Err(DocIndexError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self { client: reqwest::Client::new(), config })
    }

    /// Create a provider using [`OpenAIEmbeddingConfig::from_env`].
    ///
    /// # Errors
    ///
    /// See [`OpenAIEmbeddingConfig::from_env`] and [`OpenAIEmbeddingProvider::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIEmbeddingConfig::from_env()?)
    }

    /// The provider's settings.
    pub fn config(&self) -> &OpenAIEmbeddingConfig {
        &self.config
    }

    /// `text-embedding-ada-002` rejects the `dimensions` parameter.
    fn request_dimensions(&self) -> Option<usize> {
        (self.config.model != DEFAULT_MODEL).then_some(self.config.dimensions)
    }
}

fn api_error(message: impl Into<String>) -> DocIndexError {
    DocIndexError::Embedding { provider: PROVIDER.to_string(), message: message.into() }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| api_error("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.config.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.config.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions(),
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                api_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(api_error(format!("API returned {status}: {detail}")));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            api_error(format!("failed to parse response: {e}"))
        })?;

        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
