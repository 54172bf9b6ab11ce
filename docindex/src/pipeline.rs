//! Document pipeline: extraction, chunking and embedding of one file.
//!
//! A [`Document`] moves through [`Stage::Unparsed`] → [`Stage::Parsed`] →
//! [`Stage::Chunked`] → [`Stage::Embedded`] and is finally turned into a
//! [`DocumentRecord`] by [`DocumentPipeline::to_record`]. Every step runs the
//! steps before it if they have not run yet. The pipeline never writes to
//! disk; persisting records is the job of [`Index`](crate::index::Index).
//!
//! # Example
//!
//! ```rust,ignore
//! use docindex::{DocumentPipeline, IndexConfig};
//!
//! let pipeline = DocumentPipeline::builder()
//!     .config(IndexConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! let record = pipeline.ingest("reports/q3.pdf").await?;
//! index.add(record)?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::IndexConfig;
use crate::document::{Chunk, DocumentRecord, Segment, chunk_id, random_id};
use crate::embedding::{Embedder, EmbeddingProvider, sanitize_text};
use crate::error::{DocIndexError, Result};
use crate::extract::ExtractorRegistry;
use crate::splitter::{SplitChunk, SplitMode, TextSplitter, mode_for_extension};

/// How far a [`Document`] has progressed through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing extracted yet.
    Unparsed,
    /// Segments extracted.
    Parsed,
    /// Segments split into chunks.
    Chunked,
    /// Every chunk has an embedding.
    Embedded,
}

/// One source file on its way to becoming a [`DocumentRecord`].
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    ext: String,
    fname: String,
    stage: Stage,
    segments: Vec<Segment>,
    chunks: Vec<SplitChunk>,
    embeddings: Vec<Vec<f32>>,
}

impl Document {
    /// Prepare a single file for ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::NotFound`] if the path does not exist and
    /// [`DocIndexError::InvalidInput`] if it is a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocIndexError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(DocIndexError::InvalidInput(format!(
                "{} is a directory; ingest its files one by one",
                path.display()
            )));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let fname =
            path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            ext,
            fname,
            stage: Stage::Unparsed,
            segments: Vec::new(),
            chunks: Vec::new(),
            embeddings: Vec::new(),
        })
    }

    /// The source path as given.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension with its leading dot, as written in the file name, or `""`.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// The file name.
    pub fn fname(&self) -> &str {
        &self.fname
    }

    /// Current pipeline stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Extracted segments; empty before parsing.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Chunks; empty before chunking.
    pub fn chunks(&self) -> &[SplitChunk] {
        &self.chunks
    }

    /// Embeddings, parallel to [`chunks`](Document::chunks) once embedded.
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    fn fpath(&self) -> String {
        self.path.display().to_string()
    }
}

/// Runs documents through extraction, chunking and embedding.
///
/// Construct one via [`DocumentPipeline::builder()`].
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    config: IndexConfig,
    extractors: Arc<ExtractorRegistry>,
    embedder: Embedder,
}

impl DocumentPipeline {
    /// Create a new [`DocumentPipelineBuilder`].
    pub fn builder() -> DocumentPipelineBuilder {
        DocumentPipelineBuilder::default()
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The embedder shared with retrieval.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// The registered content extractors.
    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Extract the document's segments, resetting any later stage.
    ///
    /// Extraction runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::UnsupportedFormat`] if no extractor matches
    /// the extension, or the extractor's own error.
    pub async fn parse(&self, doc: &mut Document) -> Result<()> {
        let registry = Arc::clone(&self.extractors);
        let path = doc.path.clone();
        let segments = tokio::task::spawn_blocking(move || registry.extract(&path))
            .await
            .map_err(|e| {
                DocIndexError::extraction(
                    doc.ext.trim_start_matches('.'),
                    format!("extraction task failed: {e}"),
                )
            })?
            .map_err(|e| {
                error!(document = %doc.path.display(), error = %e, "extraction failed");
                e
            })?;

        info!(document = %doc.path.display(), segment_count = segments.len(), "parsed");
        doc.segments = segments;
        doc.chunks.clear();
        doc.embeddings.clear();
        doc.stage = Stage::Parsed;
        Ok(())
    }

    /// Split the document's segments into chunks, parsing first if needed.
    ///
    /// Program-source and notebook extensions always use
    /// [`SplitMode::Code`]; otherwise `mode` or the configured default applies.
    ///
    /// # Errors
    ///
    /// Propagates parse errors and [`DocIndexError::Config`] from splitter
    /// construction.
    pub async fn chunk(&self, doc: &mut Document, mode: Option<SplitMode>) -> Result<()> {
        if doc.stage < Stage::Parsed {
            self.parse(doc).await?;
        }

        let (mode, language) =
            mode_for_extension(&doc.ext, mode.unwrap_or(self.config.split_mode));
        let splitter = TextSplitter::for_mode(
            mode,
            language,
            self.config.chunk_size,
            self.config.chunk_overlap,
            &self.config.token_model,
        )?;

        let texts: Vec<&str> = doc.segments.iter().map(|s| s.text.as_str()).collect();
        doc.chunks = splitter.split_segments(&texts);
        doc.embeddings.clear();
        doc.stage = Stage::Chunked;

        info!(
            document = %doc.path.display(),
            mode = %mode,
            chunk_count = doc.chunks.len(),
            "chunked"
        );
        Ok(())
    }

    /// Embed every chunk in one batch call, chunking first if needed.
    ///
    /// Chunks whose text sanitizes to nothing are dropped, so afterwards
    /// chunks and embeddings correspond one to one.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::EmptyInput`] if no chunk has embeddable
    /// text, or the embedding provider's error.
    pub async fn embed(&self, doc: &mut Document) -> Result<()> {
        if doc.stage < Stage::Chunked {
            self.chunk(doc, None).await?;
        }

        let total = doc.chunks.len();
        doc.chunks.retain(|chunk| sanitize_text(&chunk.text).is_some());
        if doc.chunks.is_empty() {
            return Err(DocIndexError::EmptyInput(format!(
                "{} has no text to embed",
                doc.path.display()
            )));
        }
        if doc.chunks.len() < total {
            debug!(
                document = %doc.path.display(),
                dropped = total - doc.chunks.len(),
                "dropped chunks without embeddable text"
            );
        }

        let texts: Vec<&str> = doc.chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_many(&texts).await.map_err(|e| {
            error!(document = %doc.path.display(), error = %e, "embedding failed");
            e
        })?;
        if embeddings.len() != doc.chunks.len() {
            return Err(DocIndexError::Embedding {
                provider: self.embedder.provider().name().to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    doc.chunks.len(),
                    embeddings.len()
                ),
            });
        }

        info!(
            document = %doc.path.display(),
            chunk_count = doc.chunks.len(),
            dimensions = embeddings.first().map_or(0, Vec::len),
            "embedded"
        );
        doc.embeddings = embeddings;
        doc.stage = Stage::Embedded;
        Ok(())
    }

    /// Assemble the [`DocumentRecord`], running any step not yet run.
    ///
    /// The record gets a random six-digit id; [`Index::add`](crate::index::Index::add)
    /// re-keys it if the id is already taken in that index.
    ///
    /// # Errors
    ///
    /// Propagates any error from parsing, chunking or embedding.
    pub async fn to_record(&self, mut doc: Document) -> Result<DocumentRecord> {
        if doc.stage < Stage::Embedded {
            self.embed(&mut doc).await?;
        }

        let id = random_id();
        let fpath = doc.fpath();
        let data = doc
            .chunks
            .into_iter()
            .zip(doc.embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| Chunk {
                id: chunk_id(&id, i),
                text: chunk.text,
                embedding,
                segment: chunk.segment,
            })
            .collect();

        Ok(DocumentRecord {
            id,
            fpath,
            ext: doc.ext,
            fname: doc.fname,
            metadata: doc.segments.into_iter().map(|s| s.metadata).collect(),
            data,
        })
    }

    /// Open, extract, chunk and embed one file.
    ///
    /// # Errors
    ///
    /// See [`Document::open`] and [`DocumentPipeline::to_record`].
    pub async fn ingest(&self, path: impl AsRef<Path>) -> Result<DocumentRecord> {
        let doc = Document::open(path)?;
        self.to_record(doc).await
    }

    /// Ingest every supported file under `dir`, in file-name order.
    ///
    /// Files with no registered extractor and files without embeddable text
    /// are skipped with a warning. Any other failure stops the walk.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::NotFound`] if `dir` does not exist,
    /// [`DocIndexError::InvalidInput`] if it is not a directory, or the
    /// first ingestion error.
    pub async fn ingest_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<DocumentRecord>> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(DocIndexError::NotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(DocIndexError::InvalidInput(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                DocIndexError::io(path, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.extractors.supports(path) {
                warn!(path = %path.display(), "skipping unsupported file");
                continue;
            }
            match self.ingest(path).await {
                Ok(record) => records.push(record),
                Err(DocIndexError::EmptyInput(reason)) => {
                    warn!(path = %path.display(), reason, "skipping file without text");
                }
                Err(e) => return Err(e),
            }
        }

        info!(dir = %dir.display(), document_count = records.len(), "ingested directory");
        Ok(records)
    }
}

/// Builder for constructing a [`DocumentPipeline`].
///
/// Only the embedding provider is required; the configuration defaults to
/// [`IndexConfig::default()`] and the extractors to
/// [`ExtractorRegistry::with_defaults()`].
#[derive(Default)]
pub struct DocumentPipelineBuilder {
    config: Option<IndexConfig>,
    extractors: Option<ExtractorRegistry>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl DocumentPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the extractor registry.
    pub fn extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Some(extractors);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Build the [`DocumentPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::Config`] if the embedding provider is missing
    /// or the configuration is invalid.
    pub fn build(self) -> Result<DocumentPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let provider = self.embedding_provider.ok_or_else(|| {
            DocIndexError::Config("embedding_provider is required".to_string())
        })?;

        Ok(DocumentPipeline {
            embedder: Embedder::new(provider).with_normalization(config.normalize_embeddings),
            extractors: Arc::new(self.extractors.unwrap_or_else(ExtractorRegistry::with_defaults)),
            config,
        })
    }
}
