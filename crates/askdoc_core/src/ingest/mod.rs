use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::vault::VaultStore;

pub mod chunking;

pub use chunking::{chunk_text, normalize_whitespace, DEFAULT_CHUNK_MAX_CHARS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Json,
}

impl DocumentKind {
    /// Resolve an upload's declared type (MIME type or short name).
    pub fn from_declared_type(declared: &str) -> Result<Self, AppError> {
        match declared.trim().to_ascii_lowercase().as_str() {
            "application/pdf" | "pdf" => Ok(DocumentKind::Pdf),
            "text/plain" | "txt" | "text" | "plain-text" => Ok(DocumentKind::PlainText),
            "application/json" | "json" => Ok(DocumentKind::Json),
            _ => Err(AppError::new(
                "UPLOAD_UNSUPPORTED_FORMAT",
                "Unsupported file type; upload a PDF, TXT, or JSON file",
            )
            .with_details(format!("declared_type={declared}"))),
        }
    }

    /// Best-effort declared type from a file extension; unknown extensions pass through
    /// so `from_declared_type` can reject them with a proper error.
    pub fn declared_type_for_path(path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => "application/pdf".to_string(),
            "txt" | "text" | "md" => "text/plain".to_string(),
            "json" => "application/json".to_string(),
            "" => "application/octet-stream".to_string(),
            other => other.to_string(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::PlainText => "text/plain",
            DocumentKind::Json => "application/json",
        }
    }
}

/// Extract raw text from an uploaded document.
pub fn parse_document(bytes: &[u8], kind: DocumentKind) -> Result<String, AppError> {
    match kind {
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec()).map_err(|e| {
            AppError::new("UPLOAD_PARSE_FAILED", "Text upload is not valid UTF-8")
                .with_details(e.to_string())
        }),
        DocumentKind::Json => {
            let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
                AppError::new("UPLOAD_PARSE_FAILED", "Failed to parse JSON upload")
                    .with_details(e.to_string())
            })?;
            serde_json::to_string(&value).map_err(|e| {
                AppError::new("UPLOAD_PARSE_FAILED", "Failed to re-encode JSON upload")
                    .with_details(e.to_string())
            })
        }
        DocumentKind::Pdf => {
            // pdf-extract panics on some malformed files; an upload must never crash us.
            let pages = std::panic::catch_unwind(|| {
                pdf_extract::extract_text_from_mem_by_pages(bytes)
            })
            .map_err(|_| {
                AppError::new("UPLOAD_PARSE_FAILED", "Failed to extract text from PDF")
                    .with_details("pdf parser aborted on malformed input")
            })?
            .map_err(|e| {
                AppError::new("UPLOAD_PARSE_FAILED", "Failed to extract text from PDF")
                    .with_details(e.to_string())
            })?;
            Ok(pages
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" "))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadSummary {
    pub kind: DocumentKind,
    pub chunk_count: usize,
}

/// Parse, chunk, and append an upload to the vault.
///
/// Nothing is written unless every step before the append succeeded, so a rejected or
/// unparseable upload leaves the vault untouched.
pub fn import_document(
    vault: &VaultStore,
    bytes: &[u8],
    declared_type: &str,
    max_chars: usize,
) -> Result<UploadSummary, AppError> {
    let kind = DocumentKind::from_declared_type(declared_type)?;
    let text = parse_document(bytes, kind)?;
    let chunks = chunk_text(&text, max_chars);
    if chunks.is_empty() {
        warn!(kind = kind.mime_type(), "upload produced no text chunks");
        return Ok(UploadSummary {
            kind,
            chunk_count: 0,
        });
    }

    let written = vault.append(&chunks)?;
    info!(kind = kind.mime_type(), chunks = written, "imported document");
    Ok(UploadSummary {
        kind,
        chunk_count: written,
    })
}
