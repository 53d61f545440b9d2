use std::sync::atomic::{AtomicUsize, Ordering};

use askdoc_ai::embeddings::{embed_batch, embed_batch_parallel, CachedEmbedder, Embedder, EmbeddingCache};
use askdoc_core::error::AppError;
use pretty_assertions::assert_eq;

/// Embeds text as `[len, first byte]` and fails on any text containing "boom".
struct LengthEmbedder {
    calls: AtomicUsize,
}

impl LengthEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for LengthEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.contains("boom") {
            return Err(AppError::new("AI_OLLAMA_UNREACHABLE", "connection refused").with_retryable(true));
        }
        let first = input.bytes().next().unwrap_or(0);
        Ok(vec![input.len() as f32, first as f32])
    }
}

struct RaggedEmbedder;

impl Embedder for RaggedEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        Ok(vec![1.0; input.len()])
    }
}

#[test]
fn empty_batch_makes_no_calls() {
    let embedder = LengthEmbedder::new();
    let empty: Vec<String> = Vec::new();
    assert!(embed_batch(&embedder, "m", &empty).unwrap().is_empty());
    assert!(embed_batch_parallel(&embedder, "m", &empty, 4).unwrap().is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn batch_preserves_input_order() {
    let embedder = LengthEmbedder::new();
    let texts = ["a", "bbb", "cc"];
    let vectors = embed_batch(&embedder, "m", &texts).unwrap();
    assert_eq!(
        vectors,
        vec![vec![1.0, 97.0], vec![3.0, 98.0], vec![2.0, 99.0]]
    );
    assert_eq!(embedder.calls(), 3);
}

#[test]
fn parallel_batch_matches_sequential_order() {
    let embedder = LengthEmbedder::new();
    let texts: Vec<String> = (0..64).map(|i| "x".repeat(i + 1)).collect();
    let sequential = embed_batch(&embedder, "m", &texts).unwrap();
    let parallel = embed_batch_parallel(&embedder, "m", &texts, 8).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn first_failure_aborts_and_names_the_index() {
    let embedder = LengthEmbedder::new();
    let texts = ["ok", "boom", "never"];
    let err = embed_batch(&embedder, "m", &texts).unwrap_err();
    assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");
    assert!(err.retryable);
    let details = err.details.unwrap_or_default();
    assert!(details.contains("index=1"), "details: {details}");
    assert_eq!(embedder.calls(), 2);

    let err = embed_batch_parallel(&embedder, "m", &texts, 3).unwrap_err();
    assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");
}

#[test]
fn mismatched_dimensions_fail_the_batch() {
    let err = embed_batch(&RaggedEmbedder, "m", &["ab", "abc"]).unwrap_err();
    assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");
    assert!(err.details.unwrap_or_default().contains("index=1"));
}

#[test]
fn cached_embedder_serves_repeats_without_calling_inner() {
    let inner = LengthEmbedder::new();
    let cache = EmbeddingCache::new();
    let cached = CachedEmbedder::new(&inner, &cache);

    embed_batch(&cached, "m", &["one", "two"]).unwrap();
    embed_batch(&cached, "m", &["one", "two", "three"]).unwrap();
    assert_eq!(inner.calls(), 3);
    assert_eq!(cache.len(), 3);

    // A different model is a different key.
    embed_batch(&cached, "other", &["one"]).unwrap();
    assert_eq!(inner.calls(), 4);
}
