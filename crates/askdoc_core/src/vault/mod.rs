use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info};

use crate::domain::Chunk;
use crate::error::AppError;

pub const VAULT_FILE_NAME: &str = "vault.txt";

pub fn default_vault_path(data_dir: &Path) -> PathBuf {
    data_dir.join(VAULT_FILE_NAME)
}

/// One write lock per vault path, shared by every store opened in this process.
fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let mut locks = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Newlines inside a chunk would split it across vault lines, so they become spaces.
pub fn normalize_chunk_text(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Append-only, newline-delimited chunk store ("the vault").
///
/// Line order is insertion order. Blank lines are ignored on read so a hand-edited
/// file stays loadable.
#[derive(Debug, Clone)]
pub struct VaultStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl VaultStore {
    pub fn open(path: PathBuf) -> Self {
        let lock = write_lock_for(&path);
        Self { path, lock }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn ensure_parent(&self) -> Result<(), AppError> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new("VAULT_IO_FAILED", "Failed to create vault directory")
                .with_details(format!("path={}; err={}", parent.display(), e))
        })
    }

    /// Append chunks, one line each, and return how many lines were written.
    ///
    /// Chunks that are blank after newline normalization are skipped. The whole batch
    /// is written as one block under the vault's write lock; if the write fails the
    /// file is truncated back to its previous length.
    pub fn append(&self, chunks: &[String]) -> Result<usize, AppError> {
        let lines: Vec<String> = chunks
            .iter()
            .map(|c| normalize_chunk_text(c))
            .filter(|c| !c.trim().is_empty())
            .collect();
        if lines.is_empty() {
            return Ok(0);
        }

        self.ensure_parent()?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)
            .map_err(|e| {
                AppError::new("VAULT_IO_FAILED", "Failed to open vault for append")
                    .with_details(format!("path={}; err={}", self.path.display(), e))
            })?;

        let prior_len = file
            .metadata()
            .map_err(|e| {
                AppError::new("VAULT_IO_FAILED", "Failed to stat vault file")
                    .with_details(format!("path={}; err={}", self.path.display(), e))
            })?
            .len();

        let mut buf = String::new();
        if prior_len > 0 && !ends_with_newline(&mut file)? {
            buf.push('\n');
        }
        for line in lines.iter() {
            buf.push_str(line);
            buf.push('\n');
        }

        if let Err(e) = file.write_all(buf.as_bytes()).and_then(|_| file.sync_data()) {
            // Roll back to the last fully written line.
            let rollback = file.set_len(prior_len);
            return Err(
                AppError::new("VAULT_IO_FAILED", "Failed to append chunks to vault").with_details(
                    format!(
                        "path={}; err={}; rollback_ok={}",
                        self.path.display(),
                        e,
                        rollback.is_ok()
                    ),
                ),
            );
        }

        info!(
            path = %self.path.display(),
            appended = lines.len(),
            "appended chunks to vault"
        );
        Ok(lines.len())
    }

    /// Read every chunk in insertion order. A missing vault file is an empty corpus.
    pub fn read_all(&self) -> Result<Vec<Chunk>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "vault file not found; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::new("VAULT_IO_FAILED", "Failed to read vault")
                    .with_details(format!("path={}; err={}", self.path.display(), e)))
            }
        };

        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(source_index, line)| Chunk {
                text: line.to_string(),
                source_index,
            })
            .collect())
    }

    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len()? == 0)
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool, AppError> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| {
            AppError::new("VAULT_IO_FAILED", "Failed to inspect vault tail")
                .with_details(e.to_string())
        })?;
    Ok(last[0] == b'\n')
}
