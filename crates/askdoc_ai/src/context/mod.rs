use askdoc_core::domain::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;
use crate::retrieve::RankedResult;

pub const CONTEXT_HEADER: &str = "Relevant context:";

/// Ordered, role-tagged messages ready for a generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptPayload {
    pub messages: Vec<ChatMessage>,
}

impl PromptPayload {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Render retrieved chunks, best match first, one per line under a header.
pub fn context_block(retrieved: &[RankedResult]) -> Option<String> {
    if retrieved.is_empty() {
        return None;
    }
    let body = retrieved
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!("{CONTEXT_HEADER}\n{body}"))
}

/// Assemble the generation payload.
///
/// Order: system message, retrieved context (omitted when nothing was retrieved),
/// every prior turn as given, then the latest query as a user message. Pure; the same
/// inputs always produce the same payload. No token budgeting happens here.
pub fn build_prompt(
    system_message: &str,
    retrieved: &[RankedResult],
    history: &[ConversationTurn],
    latest_query: &str,
) -> PromptPayload {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(ChatMessage::new(Role::System, system_message));
    if let Some(block) = context_block(retrieved) {
        messages.push(ChatMessage::new(Role::System, block));
    }
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::new(Role::User, latest_query));
    PromptPayload { messages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdoc_core::domain::Chunk;
    use pretty_assertions::assert_eq;

    fn hit(text: &str, source_index: usize, score: f32) -> RankedResult {
        RankedResult {
            chunk: Chunk {
                text: text.to_string(),
                source_index,
            },
            score,
        }
    }

    #[test]
    fn context_keeps_ranking_order() {
        let block = context_block(&[hit("second in vault", 1, 0.9), hit("first in vault", 0, 0.2)]);
        assert_eq!(
            block.as_deref(),
            Some("Relevant context:\nsecond in vault\nfirst in vault")
        );
        assert_eq!(context_block(&[]), None);
    }

    #[test]
    fn chunk_text_is_inserted_verbatim() {
        let block = context_block(&[hit("  padded chunk ", 0, 0.5)]);
        assert_eq!(block.as_deref(), Some("Relevant context:\n  padded chunk "));
    }
}
