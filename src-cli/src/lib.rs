use std::io::{self, Write};

use askdoc_ai::ollama::OllamaClient;
use askdoc_ai::retrieve::RankedResult;
use askdoc_ai::session::ChatSession;
use askdoc_core::config::{AppConfig, DataDir};
use askdoc_core::error::AppError;
use askdoc_core::vault::VaultStore;
use serde::Serialize;
use tracing::{info, warn};

pub mod cli;
pub mod repl;

use cli::{AskArgs, ChatArgs, Cli, Command, StatusArgs, UploadArgs};

#[derive(Debug, Serialize)]
pub struct AiHealthStatus {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub data_dir: String,
    pub vault_path: String,
    pub chunk_count: usize,
    pub ollama_base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub top_k: usize,
    pub ollama: AiHealthStatus,
}

/// `[CODE] message (details)`, the one-line form every command prints on failure.
pub fn render_error(err: &AppError) -> String {
    match err.details.as_deref() {
        Some(details) if !details.is_empty() => format!("{err} ({details})"),
        _ => err.to_string(),
    }
}

pub fn print_sources<W: Write>(out: &mut W, sources: &[RankedResult]) -> io::Result<()> {
    if sources.is_empty() {
        return writeln!(out, "(no sources)");
    }
    writeln!(out, "Sources:")?;
    for (rank, hit) in sources.iter().enumerate() {
        writeln!(
            out,
            "  {}. [{:.3}] #{} {}",
            rank + 1,
            hit.score,
            hit.chunk.source_index,
            hit.chunk.text
        )?;
    }
    Ok(())
}

fn apply_top_k(config: &mut AppConfig, top_k: Option<usize>) -> Result<(), AppError> {
    if let Some(k) = top_k {
        config.top_k = k;
        config.validate()?;
    }
    Ok(())
}

fn warn_if_vault_empty(vault: &VaultStore) -> Result<(), AppError> {
    if vault.is_empty()? {
        warn!(
            vault = %vault.path().display(),
            "no documents uploaded yet; answers will have no document context"
        );
    }
    Ok(())
}

pub fn ai_health_check(config: &AppConfig) -> AiHealthStatus {
    let checked = OllamaClient::from_config(config).and_then(|client| client.health_check());
    match checked {
        Ok(()) => AiHealthStatus {
            ok: true,
            message: format!("Ollama reachable at {}", config.ollama_base_url),
        },
        Err(e) => AiHealthStatus {
            ok: false,
            message: render_error(&e),
        },
    }
}

pub fn status_report(config: &AppConfig, data_dir: &DataDir) -> Result<StatusReport, AppError> {
    let vault = VaultStore::open(data_dir.vault_file());
    Ok(StatusReport {
        data_dir: data_dir.root().display().to_string(),
        vault_path: vault.path().display().to_string(),
        chunk_count: vault.len()?,
        ollama_base_url: config.ollama_base_url.clone(),
        embed_model: config.embed_model.clone(),
        chat_model: config.chat_model.clone(),
        top_k: config.top_k,
        ollama: ai_health_check(config),
    })
}

fn cmd_upload(config: &AppConfig, data_dir: &DataDir, args: &UploadArgs) -> Result<(), AppError> {
    let session = ChatSession::from_config(config, data_dir)?;
    let summary = session.upload_file(&args.file, args.declared_type.as_deref())?;
    if summary.chunk_count == 0 {
        println!("{} contained no text; nothing was added.", args.file.display());
    } else {
        println!(
            "Added {} chunks ({}) to {}",
            summary.chunk_count,
            summary.kind.mime_type(),
            session.vault().path().display()
        );
    }
    Ok(())
}

fn cmd_ask(mut config: AppConfig, data_dir: &DataDir, args: &AskArgs) -> Result<(), AppError> {
    apply_top_k(&mut config, args.top_k)?;
    let mut session = ChatSession::from_config(&config, data_dir)?;
    warn_if_vault_empty(session.vault())?;

    let reply = session.ask(&args.question.join(" "))?;
    let mut out = io::stdout().lock();
    let printed = writeln!(out, "{}", reply.text).and_then(|()| {
        if args.sources {
            print_sources(&mut out, &reply.sources)
        } else {
            Ok(())
        }
    });
    printed.map_err(|e| AppError::new("CLI_IO_FAILED", "Failed to write answer").with_details(e.to_string()))
}

fn cmd_chat(mut config: AppConfig, data_dir: &DataDir, args: &ChatArgs) -> Result<(), AppError> {
    apply_top_k(&mut config, args.top_k)?;
    let mut session = ChatSession::from_config(&config, data_dir)?;
    warn_if_vault_empty(session.vault())?;
    info!(
        vault = %session.vault().path().display(),
        chat_model = %config.chat_model,
        "starting chat session"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run_repl(&mut session, stdin.lock(), &mut stdout, args.sources)
}

fn cmd_status(config: &AppConfig, data_dir: &DataDir, args: &StatusArgs) -> Result<(), AppError> {
    let report = status_report(config, data_dir)?;
    if args.json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| {
            AppError::new("CLI_IO_FAILED", "Failed to serialize status").with_details(e.to_string())
        })?;
        println!("{text}");
        return Ok(());
    }

    println!("Data dir:    {}", report.data_dir);
    println!("Vault:       {}", report.vault_path);
    println!("Chunks:      {}", report.chunk_count);
    println!("Ollama:      {}", report.ollama_base_url);
    println!("Models:      embed={} chat={}", report.embed_model, report.chat_model);
    println!("Top k:       {}", report.top_k);
    println!(
        "Health:      {} ({})",
        if report.ollama.ok { "ok" } else { "unavailable" },
        report.ollama.message
    );
    Ok(())
}

pub fn run(cli: Cli) -> Result<(), AppError> {
    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let config = AppConfig::load(&data_dir, cli.config.as_deref())?;

    match cli.command {
        Command::Upload(args) => cmd_upload(&config, &data_dir, &args),
        Command::Ask(args) => cmd_ask(config, &data_dir, &args),
        Command::Chat(args) => cmd_chat(config, &data_dir, &args),
        Command::Status(args) => cmd_status(&config, &data_dir, &args),
    }
}
