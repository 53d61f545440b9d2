use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::ingest::DEFAULT_CHUNK_MAX_CHARS;

mod data_dir;

pub use data_dir::DataDir;

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant that extracts the most useful information \
from a given text and provides extra relevant info.";

/// Runtime settings. Every field has a default so a partial `config.json` is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub ollama_base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub top_k: usize,
    pub system_message: String,
    pub chunk_max_chars: usize,
    pub embed_timeout_ms: u64,
    pub chat_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub embed_concurrency: usize,
    pub cache_embeddings: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            embed_model: "mxbai-embed-large".to_string(),
            chat_model: "llama3".to_string(),
            top_k: 3,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            chunk_max_chars: DEFAULT_CHUNK_MAX_CHARS,
            embed_timeout_ms: 10_000,
            chat_timeout_ms: 120_000,
            max_retries: 0,
            retry_backoff_ms: 250,
            embed_concurrency: 1,
            cache_embeddings: false,
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then the JSON file, then `ASKDOC_*` overrides.
    ///
    /// An explicit `config_path` must exist. Without one, `<data_dir>/config.json` is
    /// read when present and silently skipped otherwise.
    pub fn load(data_dir: &DataDir, config_path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = data_dir.config_file();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!(path = %path.display(), "no config file; using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("CONFIG_INVALID", "Failed to decode config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ASKDOC_OLLAMA_URL") {
            self.ollama_base_url = v;
        }
        if let Some(v) = lookup("ASKDOC_EMBED_MODEL") {
            self.embed_model = v;
        }
        if let Some(v) = lookup("ASKDOC_CHAT_MODEL") {
            self.chat_model = v;
        }
        if let Some(v) = lookup("ASKDOC_TOP_K") {
            self.top_k = v.trim().parse().map_err(|_| {
                AppError::new("CONFIG_INVALID", "ASKDOC_TOP_K must be a positive integer")
                    .with_details(format!("value={v}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |message: &str, details: String| {
            Err(AppError::new("CONFIG_INVALID", message).with_details(details))
        };
        if self.top_k == 0 {
            return invalid("top_k must be at least 1", format!("top_k={}", self.top_k));
        }
        if self.chunk_max_chars == 0 {
            return invalid(
                "chunk_max_chars must be at least 1",
                format!("chunk_max_chars={}", self.chunk_max_chars),
            );
        }
        if self.embed_timeout_ms == 0 || self.chat_timeout_ms == 0 {
            return invalid(
                "Timeouts must be non-zero",
                format!(
                    "embed_timeout_ms={}; chat_timeout_ms={}",
                    self.embed_timeout_ms, self.chat_timeout_ms
                ),
            );
        }
        if self.embed_concurrency == 0 {
            return invalid(
                "embed_concurrency must be at least 1",
                "embed_concurrency=0".to_string(),
            );
        }
        if self.embed_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return invalid(
                "Model names must not be empty",
                format!(
                    "embed_model={:?}; chat_model={:?}",
                    self.embed_model, self.chat_model
                ),
            );
        }
        Ok(())
    }
}
