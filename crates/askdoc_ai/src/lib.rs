pub mod chat;
pub mod context;
pub mod embeddings;
pub mod llm;
pub mod ollama;
pub mod retrieve;
pub mod session;

pub use chat::{ChatOrchestrator, ChatReply, ChatSettings, DEFAULT_TOP_K};
pub use context::{build_prompt, PromptPayload};
pub use retrieve::{rank, Corpus, RankedResult};
pub use session::{ChatSession, SessionSettings};
