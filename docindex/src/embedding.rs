//! Embedding providers and the sanitizing [`Embedder`] wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DocIndexError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// Providers receive text that has already been sanitized by an [`Embedder`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, one per input.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short name used in logs and errors.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Reduce text to what the embedding model accepts.
///
/// Drops non-ASCII characters, turns newlines into spaces and trims. Returns
/// `None` when nothing is left.
pub fn sanitize_text(text: &str) -> Option<String> {
    let sanitized: String =
        text.chars().filter(char::is_ascii).map(|c| if c == '\n' { ' ' } else { c }).collect();
    let trimmed = sanitized.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Scale `vector` to unit L2 norm. Zero vectors are left unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// The embedding capability used by ingestion and retrieval.
///
/// Sanitizes input before calling the provider, checks that every returned
/// vector has the same dimensionality, and optionally normalizes the vectors
/// so that similarity can be computed as a plain dot product.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    normalize: bool,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.name())
            .field("normalize", &self.normalize)
            .finish()
    }
}

impl Embedder {
    /// Wrap a provider. Normalization is on.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider, normalize: true }
    }

    /// Enable or disable L2 normalization of returned vectors.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Dimensionality reported by the provider.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::EmptyInput`] if the text sanitizes to nothing,
    /// or the provider's error.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let sanitized = sanitize_text(text).ok_or_else(|| {
            DocIndexError::EmptyInput("text is empty after sanitization".to_string())
        })?;
        debug!(provider = self.provider.name(), text_len = sanitized.len(), "embedding text");

        let mut embedding = self.provider.embed(&sanitized).await?;
        if self.normalize {
            normalize(&mut embedding);
        }
        Ok(embedding)
    }

    /// Embed many texts in one provider call.
    ///
    /// Texts that sanitize to nothing are dropped before the call, so the
    /// output can be shorter than the input.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::EmptyInput`] if every text sanitizes to
    /// nothing, [`DocIndexError::Embedding`] if the provider returns the wrong
    /// number of vectors or vectors of differing length.
    pub async fn embed_many<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<f32>>> {
        let sanitized: Vec<String> =
            texts.iter().filter_map(|text| sanitize_text(text.as_ref())).collect();
        if sanitized.is_empty() {
            return Err(DocIndexError::EmptyInput(
                "every text is empty after sanitization".to_string(),
            ));
        }

        let dropped = texts.len() - sanitized.len();
        debug!(
            provider = self.provider.name(),
            batch_size = sanitized.len(),
            dropped,
            "embedding batch"
        );

        let refs: Vec<&str> = sanitized.iter().map(String::as_str).collect();
        let mut embeddings = self.provider.embed_batch(&refs).await?;

        if embeddings.len() != refs.len() {
            return Err(DocIndexError::Embedding {
                provider: self.provider.name().to_string(),
                message: format!("expected {} embeddings, got {}", refs.len(), embeddings.len()),
            });
        }
        if let Some(first) = embeddings.first().map(Vec::len) {
            if embeddings.iter().any(|e| e.len() != first) {
                return Err(DocIndexError::Embedding {
                    provider: self.provider.name().to_string(),
                    message: "embeddings have inconsistent dimensions".to_string(),
                });
            }
        }

        if self.normalize {
            embeddings.iter_mut().for_each(|e| normalize(e));
        }
        Ok(embeddings)
    }
}
