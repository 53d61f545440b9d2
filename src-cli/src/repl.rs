use std::io::{BufRead, Write};
use std::path::Path;

use askdoc_ai::session::ChatSession;
use askdoc_core::error::AppError;
use tracing::debug;

use crate::{print_sources, render_error};

pub const HELP: &str = "Commands:
  /clear           forget the conversation and cached embeddings (the vault is kept)
  /reload          re-read the vault and recompute embeddings
  /upload <FILE>   add a document to the vault (applies on the next /reload)
  /history         show the conversation so far
  /help            show this help
  /quit            leave the chat
Anything else is sent as a question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Empty,
    Ask(&'a str),
    Clear,
    Reload,
    Upload(&'a str),
    History,
    Help,
    Quit,
    Unknown(&'a str),
}

pub fn parse_line(line: &str) -> ReplCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Ask(line);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("clear", "") => ReplCommand::Clear,
        ("reload", "") => ReplCommand::Reload,
        ("upload", path) if !path.is_empty() => ReplCommand::Upload(path),
        ("history", "") => ReplCommand::History,
        ("help", "") => ReplCommand::Help,
        ("quit" | "exit", "") => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line),
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::new("CLI_IO_FAILED", "Terminal I/O failed").with_details(e.to_string())
}

/// Drive a chat session from `input` until `/quit` or end of input.
///
/// Per-query failures are reported on `out` and the loop keeps going; only terminal
/// I/O errors end it early.
pub fn run_repl<R: BufRead, W: Write>(
    session: &mut ChatSession,
    input: R,
    out: &mut W,
    show_sources: bool,
) -> Result<(), AppError> {
    writeln!(out, "Type a question, or /help for commands.").map_err(io_error)?;
    let mut lines = input.lines();
    loop {
        write!(out, "> ").map_err(io_error)?;
        out.flush().map_err(io_error)?;
        let Some(line) = lines.next() else {
            writeln!(out).map_err(io_error)?;
            return Ok(());
        };
        let line = line.map_err(io_error)?;

        let command = parse_line(&line);
        debug!(?command, "repl command");
        match command {
            ReplCommand::Empty => {}
            ReplCommand::Quit => return Ok(()),
            ReplCommand::Help => writeln!(out, "{HELP}").map_err(io_error)?,
            ReplCommand::Unknown(text) => {
                writeln!(out, "Unknown command: {text} (try /help)").map_err(io_error)?
            }
            ReplCommand::Clear => {
                session.clear();
                writeln!(out, "Conversation cleared.").map_err(io_error)?;
            }
            ReplCommand::Reload => match session.load() {
                Ok(corpus) => {
                    let n = corpus.len();
                    writeln!(out, "Reloaded {n} chunks.").map_err(io_error)?
                }
                Err(e) => writeln!(out, "error: {}", render_error(&e)).map_err(io_error)?,
            },
            ReplCommand::Upload(path) => match session.upload_file(Path::new(path), None) {
                Ok(summary) => writeln!(
                    out,
                    "Added {} chunks from {path}; /reload to use them.",
                    summary.chunk_count
                )
                .map_err(io_error)?,
                Err(e) => writeln!(out, "error: {}", render_error(&e)).map_err(io_error)?,
            },
            ReplCommand::History => {
                if session.conversation().is_empty() {
                    writeln!(out, "(no messages yet)").map_err(io_error)?;
                }
                for turn in session.conversation().turns() {
                    writeln!(out, "{}: {}", turn.role.as_str(), turn.content).map_err(io_error)?;
                }
            }
            ReplCommand::Ask(query) => match session.ask(query) {
                Ok(reply) => {
                    writeln!(out, "{}", reply.text).map_err(io_error)?;
                    if show_sources {
                        print_sources(out, &reply.sources).map_err(io_error)?;
                    }
                }
                Err(e) => writeln!(out, "error: {}", render_error(&e)).map_err(io_error)?,
            },
        }
    }
}
