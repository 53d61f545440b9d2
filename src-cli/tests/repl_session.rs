use std::io::Cursor;

use askdoc_ai::chat::ChatSettings;
use askdoc_ai::embeddings::Embedder;
use askdoc_ai::llm::{ChatMessage, Llm};
use askdoc_ai::session::{ChatSession, SessionSettings};
use askdoc_core::error::AppError;
use askdoc_core::vault::VaultStore;
use askdoc_lib::repl::run_repl;
use tempfile::tempdir;

struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let lower = input.to_ascii_lowercase();
        Ok(vec![
            lower.matches("paris").count() as f32,
            lower.matches("tokyo").count() as f32,
            1.0,
        ])
    }
}

/// Replies with the context message it was given, or a fixed line without one.
struct EchoContextLlm;

impl Llm for EchoContextLlm {
    fn chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, AppError> {
        Ok(messages
            .iter()
            .find(|m| m.content.starts_with("Relevant context:"))
            .map(|m| m.content.replace('\n', " | "))
            .unwrap_or_else(|| "no context".to_string()))
    }
}

fn session(dir: &std::path::Path) -> ChatSession {
    ChatSession::new(
        VaultStore::open(dir.join("vault.txt")),
        Box::new(LetterEmbedder),
        Box::new(EchoContextLlm),
        SessionSettings::new(ChatSettings::new("embed", "chat").with_top_k(1)),
    )
}

fn drive(session: &mut ChatSession, script: &str, sources: bool) -> String {
    let mut out = Vec::new();
    run_repl(session, Cursor::new(script.to_string()), &mut out, sources).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn upload_then_reload_makes_new_chunks_answerable() {
    let dir = tempdir().unwrap();
    let doc = dir.path().join("cities.txt");
    std::fs::write(&doc, "Paris is in France. Tokyo is in Japan.").unwrap();

    let mut session = session(dir.path());
    let script = format!(
        "tell me about paris\n/upload {}\ntell me about paris\n/reload\ntell me about paris\n/quit\nnever read\n",
        doc.display()
    );
    let out = drive(&mut session, &script, false);

    assert!(out.contains("no context"), "{out}");
    assert!(out.contains("Added 1 chunks"), "{out}");
    assert!(out.contains("Reloaded 1 chunks."), "{out}");
    assert!(
        out.contains("Relevant context: | Paris is in France. Tokyo is in Japan."),
        "{out}"
    );
    assert_eq!(session.conversation().len(), 6);
}

#[test]
fn clear_and_history_manage_the_conversation_only() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path());
    session.upload(b"Tokyo is in Japan.", "text/plain").unwrap();

    let out = drive(&mut session, "/history\nwhere is tokyo\n/history\n/clear\n/history\n", true);

    assert!(out.contains("(no messages yet)"), "{out}");
    assert!(out.contains("user: where is tokyo"), "{out}");
    assert!(out.contains("Sources:"), "{out}");
    assert!(out.contains("Conversation cleared."), "{out}");
    assert!(session.conversation().is_empty());
    assert_eq!(session.vault().len().unwrap(), 1);
}

#[test]
fn failures_are_reported_and_the_loop_continues() {
    let dir = tempdir().unwrap();
    let mut session = session(dir.path());

    let out = drive(&mut session, "/upload picture.gif\n/bogus\nhello\n", false);

    assert!(out.contains("error: [UPLOAD_UNSUPPORTED_FORMAT]"), "{out}");
    assert!(out.contains("Unknown command: /bogus"), "{out}");
    assert!(out.contains("no context"), "{out}");
    assert_eq!(session.conversation().len(), 2);
}
