use askdoc_core::domain::{ConversationTurn, Role};
use askdoc_core::error::AppError;
use serde::{Deserialize, Serialize};

pub mod ollama_llm;

pub use ollama_llm::OllamaLlm;

/// One role-tagged message of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

pub trait Llm: Send + Sync {
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, AppError>;
}
