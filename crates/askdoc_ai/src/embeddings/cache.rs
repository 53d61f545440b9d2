//! Opt-in, session-scoped embedding cache.
//!
//! Keys are content hashes of `(model, text)`, so appending to the vault never
//! invalidates existing entries. Vectors live in memory only and are dropped when the
//! session clears.

use std::collections::HashMap;
use std::sync::Mutex;

use askdoc_core::error::AppError;
use sha2::{Digest, Sha256};

use super::Embedder;

pub fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model: &str, text: &str) -> Option<Vec<f32>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&cache_key(model, text)).cloned()
    }

    pub fn insert(&self, model: &str, text: &str, vector: Vec<f32>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(cache_key(model, text), vector);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Embedder decorator that serves repeats from an [`EmbeddingCache`].
pub struct CachedEmbedder<'a> {
    inner: &'a dyn Embedder,
    cache: &'a EmbeddingCache,
}

impl<'a> CachedEmbedder<'a> {
    pub fn new(inner: &'a dyn Embedder, cache: &'a EmbeddingCache) -> Self {
        Self { inner, cache }
    }
}

impl Embedder for CachedEmbedder<'_> {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        if let Some(v) = self.cache.get(model, input) {
            return Ok(v);
        }
        let v = self.inner.embed(model, input)?;
        self.cache.insert(model, input, v.clone());
        Ok(v)
    }
}
