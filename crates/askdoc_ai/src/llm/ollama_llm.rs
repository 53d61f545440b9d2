use askdoc_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, Llm};
use crate::ollama::OllamaClient;

#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    fn chat_once(&self, model: &str, messages: &[ChatMessage]) -> Result<String, AppError> {
        let url = format!("{}/api/chat", self.client.base_url());
        let req = ChatRequest {
            model,
            messages,
            stream: false,
        };

        let resp = ureq::post(&url)
            .timeout(self.client.chat_timeout())
            .send_json(req);

        match resp {
            Ok(r) if r.status() == 200 => {
                let v: ChatResponse = r.into_json().map_err(|e| {
                    AppError::new("AI_GENERATION_FAILED", "Failed to decode chat response")
                        .with_details(e.to_string())
                })?;
                Ok(v.into_text())
            }
            Ok(r) => Err(
                AppError::new("AI_GENERATION_FAILED", "Chat request failed")
                    .with_details(format!("status={}; model={}", r.status(), model)),
            ),
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(
                    AppError::new("AI_GENERATION_FAILED", "Chat request failed")
                        .with_details(format!("status={code}; model={model}; body={body}"))
                        .with_retryable(code == 429 || code >= 500),
                )
            }
            Err(e) => Err(
                AppError::new("AI_GENERATION_FAILED", "Failed to call chat endpoint")
                    .with_details(format!("url={url}; err={e}"))
                    .with_retryable(true),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl ChatResponse {
    // Returned as generated; blank replies are the caller's call.
    fn into_text(self) -> String {
        self.message.content
    }
}

impl Llm for OllamaLlm {
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, AppError> {
        debug!(model, messages = messages.len(), "requesting chat completion");
        self.client
            .retry()
            .run("chat", || self.chat_once(model, messages))
    }
}
