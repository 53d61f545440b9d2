use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use askdoc_ai::embeddings::Embedder;
use askdoc_ai::retrieve::{rank, Corpus};
use askdoc_core::domain::Chunk;
use askdoc_core::error::AppError;
use pretty_assertions::assert_eq;

struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl TableEmbedder {
    fn new(pairs: &[(&str, Vec<f32>)]) -> Self {
        Self {
            table: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(input)
            .cloned()
            .ok_or_else(|| AppError::new("AI_EMBEDDINGS_FAILED", "unknown text").with_details(input))
    }
}

fn chunk(text: &str, source_index: usize) -> Chunk {
    Chunk {
        text: text.to_string(),
        source_index,
    }
}

fn corpus(entries: &[(&str, Vec<f32>)]) -> Corpus {
    let chunks = entries
        .iter()
        .enumerate()
        .map(|(i, (t, _))| chunk(t, i))
        .collect();
    let vectors = entries.iter().map(|(_, v)| v.clone()).collect();
    Corpus::new(chunks, vectors).unwrap()
}

#[test]
fn ranks_by_descending_cosine_similarity() {
    let embedder = TableEmbedder::new(&[("capital of france", vec![1.0, 0.0])]);
    let corpus = corpus(&[
        ("tokyo is in japan", vec![0.1, 0.99499]),
        ("paris is the capital of france", vec![0.9, 0.43589]),
        ("lyon is in france", vec![0.7, 0.71414]),
    ]);

    let hits = rank(&embedder, "m", "capital of france", &corpus, 2).unwrap();
    let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["paris is the capital of france", "lyon is in france"]);
    assert!((hits[0].score - 0.9).abs() < 1e-4);
    assert!(hits[0].score >= hits[1].score);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn result_length_is_min_of_top_k_and_corpus_size() {
    let embedder = TableEmbedder::new(&[("q", vec![1.0, 1.0])]);
    let corpus = corpus(&[("a", vec![1.0, 0.0]), ("b", vec![0.0, 1.0])]);

    assert_eq!(rank(&embedder, "m", "q", &corpus, 1).unwrap().len(), 1);
    assert_eq!(rank(&embedder, "m", "q", &corpus, 2).unwrap().len(), 2);
    assert_eq!(rank(&embedder, "m", "q", &corpus, 10).unwrap().len(), 2);
}

#[test]
fn ties_break_by_vault_position() {
    let embedder = TableEmbedder::new(&[("q", vec![1.0, 0.0])]);
    let corpus = corpus(&[
        ("zero", vec![0.0, 1.0]),
        ("one", vec![2.0, 0.0]),
        ("two", vec![1.0, 0.0]),
        ("three", vec![5.0, 0.0]),
    ]);

    let hits = rank(&embedder, "m", "q", &corpus, 4).unwrap();
    let order: Vec<usize> = hits.iter().map(|h| h.chunk.source_index).collect();
    assert_eq!(order, vec![1, 2, 3, 0]);

    // Same inputs, same output.
    let again = rank(&embedder, "m", "q", &corpus, 4).unwrap();
    assert_eq!(hits, again);
}

#[test]
fn empty_corpus_returns_nothing_without_embedding() {
    let embedder = TableEmbedder::new(&[]);
    let hits = rank(&embedder, "m", "anything", &Corpus::empty(), 3).unwrap();
    assert!(hits.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn rejects_zero_top_k_and_blank_query() {
    let embedder = TableEmbedder::new(&[]);
    let corpus = corpus(&[("a", vec![1.0])]);

    let err = rank(&embedder, "m", "q", &corpus, 0).unwrap_err();
    assert_eq!(err.code, "INVALID_ARGUMENT");

    let err = rank(&embedder, "m", "  \n", &corpus, 3).unwrap_err();
    assert_eq!(err.code, "INVALID_ARGUMENT");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn query_dims_must_match_corpus() {
    let embedder = TableEmbedder::new(&[("q", vec![1.0, 0.0, 0.0])]);
    let corpus = corpus(&[("a", vec![1.0, 0.0])]);
    let err = rank(&embedder, "m", "q", &corpus, 1).unwrap_err();
    assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");
}

#[test]
fn zero_vectors_score_zero_instead_of_failing() {
    let embedder = TableEmbedder::new(&[("q", vec![1.0, 0.0])]);
    let corpus = corpus(&[("blank", vec![0.0, 0.0]), ("match", vec![1.0, 0.0])]);
    let hits = rank(&embedder, "m", "q", &corpus, 2).unwrap();
    assert_eq!(hits[0].chunk.text, "match");
    assert_eq!(hits[1].score, 0.0);
}

#[test]
fn corpus_rejects_mismatched_lengths() {
    let err = Corpus::new(vec![chunk("a", 0), chunk("b", 1)], vec![vec![1.0]]).unwrap_err();
    assert_eq!(err.code, "INVALID_ARGUMENT");
}

#[test]
fn corpus_rejects_mixed_dimensions() {
    let err = Corpus::new(
        vec![chunk("a", 0), chunk("b", 1)],
        vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]],
    )
    .unwrap_err();
    assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");
    assert!(err.details.unwrap_or_default().contains("index=1"));
}

#[test]
fn empty_corpus_wins_over_blank_query() {
    let embedder = TableEmbedder::new(&[]);
    let hits = rank(&embedder, "m", "   ", &Corpus::empty(), 3).unwrap();
    assert!(hits.is_empty());

    let err = rank(&embedder, "m", "   ", &Corpus::empty(), 0).unwrap_err();
    assert_eq!(err.code, "INVALID_ARGUMENT");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn large_magnitude_vectors_still_score_as_identical() {
    let embedder = TableEmbedder::new(&[("q", vec![1e20, 0.0])]);
    let corpus = corpus(&[("huge", vec![1e20, 0.0]), ("other", vec![0.0, 1e20])]);
    let hits = rank(&embedder, "m", "q", &corpus, 2).unwrap();
    assert_eq!(hits[0].chunk.text, "huge");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert_eq!(hits[1].score, 0.0);
}
