use askdoc_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Embedder;
use crate::ollama::{truncate_at_char_boundary, OllamaClient};

const MAX_PROMPT_BYTES: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    fn embed_once(&self, model: &str, prompt: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest { model, prompt };
        let resp = ureq::post(&url)
            .timeout(self.client.embed_timeout())
            .send_json(req);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: EmbeddingsResponse = r.into_json().map_err(|e| {
                    AppError::new("AI_EMBEDDINGS_FAILED", "Failed to decode embeddings response")
                        .with_details(e.to_string())
                })?;
                if v.embedding.is_empty() {
                    return Err(AppError::new(
                        "AI_EMBEDDINGS_FAILED",
                        "Embeddings response was empty",
                    )
                    .with_details(format!("model={model}")));
                }
                Ok(v.embedding)
            }
            Ok(r) => Err(
                AppError::new("AI_EMBEDDINGS_FAILED", "Embeddings request failed")
                    .with_details(format!("status={}; model={}", r.status(), model)),
            ),
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(
                    AppError::new("AI_EMBEDDINGS_FAILED", "Embeddings request failed")
                        .with_details(format!("status={code}; model={model}; body={body}"))
                        .with_retryable(code == 429 || code >= 500),
                )
            }
            Err(e) => Err(
                AppError::new("AI_EMBEDDINGS_FAILED", "Failed to call embeddings endpoint")
                    .with_details(format!("url={url}; err={e}"))
                    .with_retryable(true),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let prompt = truncate_at_char_boundary(input, MAX_PROMPT_BYTES);
        debug!(model, bytes = prompt.len(), "requesting embedding");
        self.client
            .retry()
            .run("embeddings", || self.embed_once(model, prompt))
    }
}
