//! Configuration for ingestion and retrieval.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocIndexError, Result};
use crate::splitter::SplitMode;

/// Configuration parameters for the indexing pipeline and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum chunk size, in characters (or tokens in token-count mode).
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in the same unit as `chunk_size`.
    pub chunk_overlap: usize,
    /// Splitter mode used when the file extension does not force one.
    pub split_mode: SplitMode,
    /// Model whose tokenizer measures chunks in token-count mode.
    pub token_model: String,
    /// Number of results returned by search when no `top_k` is given.
    pub top_k: usize,
    /// Directory in which freshly created indexes are written.
    pub index_dir: PathBuf,
    /// L2-normalize embeddings so that the dot product equals cosine similarity.
    pub normalize_embeddings: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 0,
            split_mode: SplitMode::Default,
            token_model: "gpt-3.5-turbo".to_string(),
            top_k: 5,
            index_dir: PathBuf::from("data/indexes"),
            normalize_embeddings: true,
        }
    }
}

impl IndexConfig {
    /// Create a new builder for constructing an [`IndexConfig`].
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::NotFound`] if the file does not exist,
    /// [`DocIndexError::Config`] if it is not valid JSON or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocIndexError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| DocIndexError::io(path, e))?;
        let config: IndexConfig = serde_json::from_str(&raw).map_err(|e| {
            DocIndexError::Config(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(DocIndexError::Config("top_k must be greater than zero".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(DocIndexError::Config("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(DocIndexError::Config(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`IndexConfig`].
#[derive(Debug, Clone, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Set the maximum chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default splitter mode.
    pub fn split_mode(mut self, mode: SplitMode) -> Self {
        self.config.split_mode = mode;
        self
    }

    /// Set the model whose tokenizer is used in token-count mode.
    pub fn token_model(mut self, model: impl Into<String>) -> Self {
        self.config.token_model = model.into();
        self
    }

    /// Set the default number of search results.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the directory for new index files.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = dir.into();
        self
    }

    /// Enable or disable explicit L2 normalization of embeddings.
    pub fn normalize_embeddings(mut self, normalize: bool) -> Self {
        self.config.normalize_embeddings = normalize;
        self
    }

    /// Build the [`IndexConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Config`] under the conditions listed on
    /// [`IndexConfig::validate`].
    pub fn build(self) -> Result<IndexConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
