use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::vault::default_vault_path;

use super::CONFIG_FILE_NAME;

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The ASKDOC_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/askdoc/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AppError> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("ASKDOC_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("askdoc")
                .get_data_home()
                .ok_or_else(|| {
                    AppError::new(
                        "DATA_DIR_FAILED",
                        "Could not determine XDG data home directory",
                    )
                })?
        };

        std::fs::create_dir_all(&root).map_err(|e| {
            AppError::new("DATA_DIR_FAILED", "Failed to create data directory")
                .with_details(format!("path={}; err={}", root.display(), e))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vault_file(&self) -> PathBuf {
        default_vault_path(&self.root)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }
}
