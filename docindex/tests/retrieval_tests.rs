//! Search tests, including property tests for result ordering.

mod common;

use std::sync::Arc;

use common::{FixedEmbeddingProvider, MockEmbeddingProvider, at_similarity, mock_pipeline, record};
use docindex::{DocIndexError, Embedder, Index, IndexConfig, Retriever, rank};
use proptest::prelude::*;

fn fixed_retriever(query: Vec<f32>) -> (Arc<FixedEmbeddingProvider>, Retriever) {
    let provider = Arc::new(FixedEmbeddingProvider::new(query));
    let retriever = Retriever::new(Embedder::new(provider.clone()));
    (provider, retriever)
}

#[tokio::test]
async fn returns_the_top_two_in_score_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index
        .add(record(
            "100001",
            &[
                ("deadline is friday", at_similarity(0.91)),
                ("deadline moved", at_similarity(0.85)),
                ("lunch menu", at_similarity(0.40)),
            ],
        ))
        .unwrap();

    let (_, retriever) = fixed_retriever(vec![1.0, 0.0]);
    let results = retriever.search("deadline", 2, &index).await.unwrap();

    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["100001-1", "100001-2"]);
    assert!((results[0].similarity - 0.91).abs() < 1e-5);
    assert!((results[1].similarity - 0.85).abs() < 1e-5);
    assert_eq!(results[0].text, "deadline is friday");
}

#[tokio::test]
async fn empty_index_returns_nothing_without_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let index = Index::create(dir.path()).unwrap();

    let (provider, retriever) = fixed_retriever(vec![1.0, 0.0]);
    let results = retriever.search("anything", 5, &index).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn ties_keep_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("200001", &[("a", at_similarity(0.5)), ("b", at_similarity(0.7))])).unwrap();
    index.add(record("200002", &[("c", at_similarity(0.5)), ("d", at_similarity(0.7))])).unwrap();

    let results = rank(&[1.0, 0.0], 10, &index).unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["200001-2", "200002-2", "200001-1", "200002-1"]);
}

#[tokio::test]
async fn dimension_mismatch_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("300001", &[("a", vec![1.0, 0.0, 0.0])])).unwrap();

    let (_, retriever) = fixed_retriever(vec![1.0, 0.0]);
    let err = retriever.search("q", 3, &index).await.unwrap_err();
    assert!(matches!(err, DocIndexError::InvalidInput(_)));
}

#[tokio::test]
async fn blank_query_is_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("400001", &[("a", vec![1.0, 0.0])])).unwrap();

    let (_, retriever) = fixed_retriever(vec![1.0, 0.0]);
    let err = retriever.search("  \n ", 3, &index).await.unwrap_err();
    assert!(matches!(err, DocIndexError::EmptyInput(_)));
}

#[tokio::test]
async fn identical_text_ranks_first() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("facts.txt");
    std::fs::write(&doc, "The sky is blue.\n\nGrass is green.\n\nSnow is white.").unwrap();

    let pipeline = mock_pipeline(IndexConfig::default());
    let mut index = Index::create(dir.path().join("idx")).unwrap();
    index.add(pipeline.ingest(&doc).await.unwrap()).unwrap();

    let retriever = Retriever::new(Embedder::new(Arc::new(MockEmbeddingProvider::new(16))));
    let results = retriever.search("Grass is green.", 1, &index).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "Grass is green.");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// *For any* index and query, search returns at most `top_k` results, sorted
/// by descending similarity with no inversions.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            documents in proptest::collection::vec(
                proptest::collection::vec(arb_normalized_embedding(DIM), 1..6),
                0..5,
            ),
            query in arb_normalized_embedding(DIM),
            top_k in 0usize..12,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let mut index = Index::create(dir.path()).unwrap();
            for (d, embeddings) in documents.iter().enumerate() {
                let chunks: Vec<(&str, Vec<f32>)> =
                    embeddings.iter().map(|e| ("chunk", e.clone())).collect();
                index.add(record(&format!("{}", 100_000 + d), &chunks)).unwrap();
            }

            let results = rank(&query, top_k, &index).unwrap();

            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), top_k.min(index.chunk_count()));
            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].similarity >= pair[1].similarity,
                    "results not sorted: {} < {}",
                    pair[0].similarity,
                    pair[1].similarity
                );
            }
        }
    }
}
