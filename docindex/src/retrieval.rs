//! Exhaustive similarity search over an [`Index`].

use tracing::{debug, info};

use crate::document::SimilarityResult;
use crate::embedding::{Embedder, dot};
use crate::error::{DocIndexError, Result};
use crate::index::Index;

/// Ranks every chunk in an index against a query.
///
/// No vector index or cache is kept: each search scans all chunks.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Embedder,
}

impl Retriever {
    /// Create a retriever. Use the same embedder configuration that built
    /// the index, or scores are meaningless.
    pub fn new(embedder: Embedder) -> Self {
        Self { embedder }
    }

    /// Embed `query` and return at most `top_k` chunks by descending
    /// similarity.
    ///
    /// An index without chunks yields an empty result without calling the
    /// embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`DocIndexError::EmptyInput`] for a blank query, the
    /// provider's error, or [`DocIndexError::InvalidInput`] if the query and
    /// chunk embeddings differ in dimension.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        index: &Index,
    ) -> Result<Vec<SimilarityResult>> {
        if index.chunk_count() == 0 {
            debug!(index.id = %index.id(), "search on empty index");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        let results = rank(&query_embedding, top_k, index)?;

        info!(
            index.id = %index.id(),
            top_k,
            result_count = results.len(),
            top_score = results.first().map(|r| r.similarity),
            "search completed"
        );
        Ok(results)
    }
}

/// Score every chunk in `index` against `query_embedding` by dot product and
/// keep the best `top_k`.
///
/// Equal scores keep index order: earlier records first, then earlier chunks.
///
/// # Errors
///
/// Returns [`DocIndexError::InvalidInput`] if a chunk's embedding length
/// differs from the query's.
pub fn rank(query_embedding: &[f32], top_k: usize, index: &Index) -> Result<Vec<SimilarityResult>> {
    let mut scored = Vec::with_capacity(index.chunk_count());
    for chunk in index.documents().iter().flat_map(|d| &d.data) {
        if chunk.embedding.len() != query_embedding.len() {
            return Err(DocIndexError::InvalidInput(format!(
                "chunk {} has {} dimensions, query has {}",
                chunk.id,
                chunk.embedding.len(),
                query_embedding.len()
            )));
        }
        scored.push(SimilarityResult {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            similarity: dot(query_embedding, &chunk.embedding),
        });
    }

    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(top_k);
    Ok(scored)
}
