//! Data types for extracted segments, chunks, document records and search results.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-segment metadata produced by a content extractor (page, row, sheet, ...).
///
/// A `BTreeMap` keeps key order stable so a synced index is byte-identical
/// across save/load cycles.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One ordered piece of text pulled out of a file, before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// The extracted text.
    pub text: String,
    /// Provenance of this segment within the file.
    pub metadata: Metadata,
}

impl Segment {
    /// Create a segment with the given text and metadata.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self { text: text.into(), metadata }
    }
}

/// A contiguous span of text from one document, with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_id}-{ordinal}`, ordinals starting at 1.
    pub id: String,
    /// The chunk's raw text.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Index into the parent record's `metadata` of the segment this chunk came from.
    #[serde(default)]
    pub segment: usize,
}

/// The persisted unit for one ingested file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    /// Six-digit identifier, unique within its index.
    pub id: String,
    /// The source path as given at ingestion time.
    pub fpath: String,
    /// The source extension including the leading dot (e.g. `.pdf`).
    pub ext: String,
    /// The source file name.
    pub fname: String,
    /// Per-segment metadata, parallel to the pre-chunk segments.
    pub metadata: Vec<Metadata>,
    /// The embedded chunks, in document order.
    pub data: Vec<Chunk>,
}

impl DocumentRecord {
    /// Replace this record's id and rewrite every chunk id to match.
    pub fn rekey(&mut self, id: impl Into<String>) {
        self.id = id.into();
        for (ordinal, chunk) in self.data.iter_mut().enumerate() {
            chunk.id = chunk_id(&self.id, ordinal);
        }
    }
}

/// Build the id of the chunk at zero-based position `index` in a document.
pub(crate) fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{document_id}-{}", index + 1)
}

/// Draw a random six-digit identifier.
pub(crate) fn random_id() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// A chunk paired with its similarity to a query. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityResult {
    /// The chunk id.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Dot product of the query and chunk embeddings (higher is more similar).
    pub similarity: f32,
}
