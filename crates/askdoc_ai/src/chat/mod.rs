use askdoc_core::config::AppConfig;
use askdoc_core::domain::ConversationTurn;
use askdoc_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::build_prompt;
use crate::embeddings::Embedder;
use crate::llm::Llm;
use crate::retrieve::{rank, Corpus, RankedResult};

/// Chunks retrieved per query when nothing else is configured.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSettings {
    pub embed_model: String,
    pub chat_model: String,
    pub top_k: usize,
}

impl ChatSettings {
    pub fn new(embed_model: impl Into<String>, chat_model: impl Into<String>) -> Self {
        Self {
            embed_model: embed_model.into(),
            chat_model: chat_model.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.embed_model.clone(), config.chat_model.clone()).with_top_k(config.top_k)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub sources: Vec<RankedResult>,
}

/// Retrieve, assemble, generate. Holds no conversation state of its own.
pub struct ChatOrchestrator<'a> {
    embedder: &'a dyn Embedder,
    llm: &'a dyn Llm,
    settings: ChatSettings,
}

impl<'a> ChatOrchestrator<'a> {
    pub fn new(embedder: &'a dyn Embedder, llm: &'a dyn Llm, settings: ChatSettings) -> Self {
        Self {
            embedder,
            llm,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Answer `query` and return the generated text verbatim.
    pub fn answer(
        &self,
        query: &str,
        system_message: &str,
        corpus: &Corpus,
        history: &[ConversationTurn],
    ) -> Result<String, AppError> {
        Ok(self
            .answer_with_sources(query, system_message, corpus, history)?
            .text)
    }

    pub fn answer_with_sources(
        &self,
        query: &str,
        system_message: &str,
        corpus: &Corpus,
        history: &[ConversationTurn],
    ) -> Result<ChatReply, AppError> {
        let sources = rank(
            self.embedder,
            &self.settings.embed_model,
            query,
            corpus,
            self.settings.top_k,
        )?;
        let payload = build_prompt(system_message, &sources, history, query);
        debug!(
            messages = payload.len(),
            sources = sources.len(),
            history = history.len(),
            "assembled prompt"
        );

        let text = self
            .llm
            .chat(&self.settings.chat_model, payload.messages())
            .map_err(|e| {
                if e.code == "AI_GENERATION_FAILED" {
                    e
                } else {
                    AppError::new("AI_GENERATION_FAILED", "Generation call failed")
                        .with_details(format!("model={}; err={}", self.settings.chat_model, e))
                        .with_retryable(e.retryable)
                }
            })?;

        info!(
            sources = sources.len(),
            reply_chars = text.chars().count(),
            "answered query"
        );
        Ok(ChatReply { text, sources })
    }
}
