use askdoc_core::domain::Chunk;
use askdoc_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embeddings::{check_dims, embed_batch, embed_batch_parallel, Embedder};

mod similarity;

pub use similarity::{cosine_similarity, l2_norm};

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// In-memory vector table: every vault chunk paired with its embedding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pair chunks with vectors. Both sequences must have the same length and every
    /// vector the same dimension.
    pub fn new(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, AppError> {
        if chunks.len() != vectors.len() {
            return Err(AppError::invalid_argument(
                "Corpus needs exactly one embedding per chunk",
            )
            .with_details(format!(
                "chunks={}; vectors={}",
                chunks.len(),
                vectors.len()
            )));
        }
        check_dims(&vectors)?;
        Ok(Self {
            entries: chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| CorpusEntry { chunk, vector })
                .collect(),
        })
    }

    /// Embed every chunk and build the table. `concurrency > 1` fans requests out.
    pub fn embed(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        model: &str,
        concurrency: usize,
    ) -> Result<Self, AppError> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = if concurrency > 1 {
            embed_batch_parallel(embedder, model, texts.as_slice(), concurrency)?
        } else {
            embed_batch(embedder, model, texts.as_slice())?
        };
        let corpus = Self::new(chunks, vectors)?;
        info!(
            chunks = corpus.len(),
            dims = corpus.dims().unwrap_or(0),
            model,
            "embedded corpus"
        );
        Ok(corpus)
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// Rank corpus chunks against `query` by cosine similarity.
///
/// Results are sorted by descending score with ties broken by ascending
/// `source_index`, and truncated to `min(top_k, corpus.len())`. An empty corpus
/// returns no results without calling the embedder, whatever the query.
pub fn rank(
    embedder: &dyn Embedder,
    model: &str,
    query: &str,
    corpus: &Corpus,
    top_k: usize,
) -> Result<Vec<RankedResult>, AppError> {
    if top_k == 0 {
        return Err(AppError::invalid_argument("top_k must be a positive integer")
            .with_details("top_k=0"));
    }
    if corpus.is_empty() {
        debug!("corpus is empty; nothing to rank");
        return Ok(Vec::new());
    }
    let q = query.trim();
    if q.is_empty() {
        return Err(AppError::invalid_argument("Query must not be empty"));
    }

    let qv = embed_batch(embedder, model, &[q])?
        .pop()
        .ok_or_else(|| AppError::new("AI_EMBEDDINGS_FAILED", "Query embedding missing"))?;
    if let Some(dims) = corpus.dims() {
        if qv.len() != dims {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Query embedding dims do not match corpus dims",
            )
            .with_details(format!("corpus_dims={dims}; query_dims={}", qv.len())));
        }
    }

    let qnorm = l2_norm(&qv);
    let mut hits: Vec<(usize, f32)> = corpus
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let score =
                similarity::cosine_similarity_with_norms(&qv, &e.vector, qnorm, l2_norm(&e.vector));
            (i, score)
        })
        .collect();

    let entries = corpus.entries();
    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(entries[a.0].chunk.source_index.cmp(&entries[b.0].chunk.source_index))
    });
    hits.truncate(top_k);

    debug!(
        candidates = corpus.len(),
        returned = hits.len(),
        top_score = hits.first().map(|h| h.1).unwrap_or(0.0),
        "ranked corpus"
    );

    Ok(hits
        .into_iter()
        .map(|(i, score)| RankedResult {
            chunk: entries[i].chunk.clone(),
            score,
        })
        .collect())
}
