//! Document indexing and semantic retrieval.
//!
//! This crate provides:
//! - Content extraction for text, code, CSV, notebooks, PDF and Office files
//! - Recursive text splitting by characters, code boundaries or model tokens
//! - A sanitizing, normalizing wrapper around any [`EmbeddingProvider`]
//! - A flat-file [`Index`] of document records with atomic rewrites
//! - Exhaustive dot-product search over an index
//! - Strict parsing of task-planning model output
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docindex::{DocumentPipeline, Index, IndexConfig, Retriever};
//!
//! let config = IndexConfig::default();
//! let pipeline = DocumentPipeline::builder()
//!     .config(config.clone())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! let mut index = Index::open(None, &config.index_dir)?;
//! index.add(pipeline.ingest("notes/meeting.txt").await?)?;
//!
//! let retriever = Retriever::new(pipeline.embedder().clone());
//! let hits = retriever.search("deadline", config.top_k, &index).await?;
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod plan;
pub mod retrieval;
pub mod splitter;

pub use config::{IndexConfig, IndexConfigBuilder};
pub use document::{Chunk, DocumentRecord, Metadata, Segment, SimilarityResult};
pub use embedding::{Embedder, EmbeddingProvider, sanitize_text};
pub use error::{DocIndexError, Result};
pub use extract::{ContentExtractor, ExtractorRegistry};
pub use index::Index;
pub use pipeline::{Document, DocumentPipeline, DocumentPipelineBuilder, Stage};
pub use retrieval::{Retriever, rank};
pub use splitter::{Language, SplitChunk, SplitMode, TextSplitter, split};
