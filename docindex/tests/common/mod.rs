//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docindex::document::{Chunk, DocumentRecord, Metadata};
use docindex::{DocIndexError, DocumentPipeline, EmbeddingProvider, IndexConfig};

/// Deterministic hash-based embeddings: equal texts get equal unit vectors.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> docindex::Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            let mixed = hash.wrapping_add(i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            *v = (mixed >> 40) as f32 / (1u64 << 24) as f32 - 0.5;
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Returns the same vector for every text and counts calls.
pub struct FixedEmbeddingProvider {
    vector: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedEmbeddingProvider {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbeddingProvider {
    async fn embed(&self, _text: &str) -> docindex::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Fails every call, like a backend that is down.
pub struct FailingEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    async fn embed(&self, _text: &str) -> docindex::Result<Vec<f32>> {
        Err(DocIndexError::Embedding {
            provider: self.name().to_string(),
            message: "service unavailable".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Answers batches with one vector too few, or with vectors whose length
/// changes from text to text when `ragged` is set.
pub struct ShortBatchProvider {
    pub ragged: bool,
}

#[async_trait]
impl EmbeddingProvider for ShortBatchProvider {
    async fn embed(&self, _text: &str) -> docindex::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[&str]) -> docindex::Result<Vec<Vec<f32>>> {
        if self.ragged {
            Ok((0..texts.len()).map(|i| vec![1.0; i + 1]).collect())
        } else {
            Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
        }
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "short-batch"
    }
}

/// A pipeline over `provider` with default settings.
pub fn pipeline_with(provider: Arc<dyn EmbeddingProvider>) -> DocumentPipeline {
    DocumentPipeline::builder()
        .config(IndexConfig::default())
        .embedding_provider(provider)
        .build()
        .unwrap()
}

/// A pipeline over the mock provider.
pub fn mock_pipeline(config: IndexConfig) -> DocumentPipeline {
    DocumentPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider::new(16)))
        .build()
        .unwrap()
}

/// A record whose chunks carry the given texts and embeddings.
pub fn record(id: &str, chunks: &[(&str, Vec<f32>)]) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        fpath: format!("docs/{id}.txt"),
        ext: ".txt".to_string(),
        fname: format!("{id}.txt"),
        metadata: vec![Metadata::new()],
        data: chunks
            .iter()
            .enumerate()
            .map(|(i, (text, embedding))| Chunk {
                id: format!("{id}-{}", i + 1),
                text: text.to_string(),
                embedding: embedding.clone(),
                segment: 0,
            })
            .collect(),
    }
}

/// A unit vector in 2-D whose dot product with `[1, 0]` is `similarity`.
pub fn at_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt()]
}
