use askdoc_core::error::AppError;
use rayon::prelude::*;
use tracing::debug;

pub mod cache;
pub mod ollama_embed;

pub use cache::{CachedEmbedder, EmbeddingCache};
pub use ollama_embed::OllamaEmbedder;

pub trait Embedder: Send + Sync {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

fn embed_one(
    embedder: &dyn Embedder,
    model: &str,
    index: usize,
    text: &str,
) -> Result<Vec<f32>, AppError> {
    embedder.embed(model, text).map_err(|e| {
        AppError::new("AI_EMBEDDINGS_FAILED", "Failed to compute embeddings")
            .with_details(format!("index={}; model={}; err={}", index, model, e))
            .with_retryable(e.retryable)
    })
}

pub(crate) fn check_dims(vectors: &[Vec<f32>]) -> Result<(), AppError> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let dims = first.len();
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dims {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Embedding dimension mismatch across chunks",
            )
            .with_details(format!("expected={}; got={}; index={}", dims, v.len(), i)));
        }
    }
    Ok(())
}

/// Embed `texts` one request at a time, preserving order.
///
/// The first failure aborts the whole batch. An empty batch makes no calls.
pub fn embed_batch<T: AsRef<str>>(
    embedder: &dyn Embedder,
    model: &str,
    texts: &[T],
) -> Result<Vec<Vec<f32>>, AppError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    debug!(count = texts.len(), model, "embedding batch");

    let mut vectors = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        vectors.push(embed_one(embedder, model, i, text.as_ref())?);
    }
    check_dims(&vectors)?;
    Ok(vectors)
}

/// Like [`embed_batch`], but fans requests out over at most `concurrency` threads.
///
/// Results come back in input order.
pub fn embed_batch_parallel<T: AsRef<str> + Sync>(
    embedder: &dyn Embedder,
    model: &str,
    texts: &[T],
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, AppError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    if concurrency <= 1 {
        return embed_batch(embedder, model, texts);
    }
    debug!(count = texts.len(), model, concurrency, "embedding batch in parallel");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .build()
        .map_err(|e| {
            AppError::new("AI_EMBEDDINGS_FAILED", "Failed to start embedding worker pool")
                .with_details(e.to_string())
        })?;

    let vectors = pool.install(|| {
        texts
            .par_iter()
            .enumerate()
            .map(|(i, text)| embed_one(embedder, model, i, text.as_ref()))
            .collect::<Result<Vec<_>, AppError>>()
    })?;
    check_dims(&vectors)?;
    Ok(vectors)
}
