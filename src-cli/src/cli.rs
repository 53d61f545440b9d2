use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "askdoc",
    version,
    about = "Chat with your documents through a local Ollama server"
)]
pub struct Cli {
    /// Override the data directory (vault and config live here)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Read settings from this JSON file instead of <data-dir>/config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a PDF, text, or JSON document to the vault
    Upload(UploadArgs),
    /// Ask a single question against the vault
    Ask(AskArgs),
    /// Start an interactive chat session
    Chat(ChatArgs),
    /// Show data locations, vault size, and Ollama health
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// File to upload
    pub file: PathBuf,

    /// Declared type (e.g. application/pdf, text/plain, json); defaults to the extension
    #[arg(long = "type", value_name = "DECLARED")]
    pub declared_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// The question; multiple words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Print the retrieved chunks and their scores after the answer
    #[arg(long)]
    pub sources: bool,

    /// Number of chunks to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Print the retrieved chunks after every answer
    #[arg(long)]
    pub sources: bool,

    /// Number of chunks to retrieve per query
    #[arg(long)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
