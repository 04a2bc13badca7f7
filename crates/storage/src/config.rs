use std::path::{Path, PathBuf};

use opsbook_core::SheetNames;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Environment variable naming the storage directory for [`StoreConfig::from_env`].
pub const STORAGE_DIR_ENV: &str = "OPSBOOK_STORAGE_DIR";

/// Where the master workbook and its neighbours live. Relative file and
/// directory names are resolved against `storage_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub storage_dir: PathBuf,
    pub master_file: String,
    pub uploads_dir: String,
    pub backups_dir: String,
    pub sheets: SheetNames,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            master_file: "data.xlsx".into(),
            uploads_dir: "uploads".into(),
            backups_dir: "backups".into(),
            sheets: SheetNames::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Defaults, with the storage directory taken from `OPSBOOK_STORAGE_DIR`
    /// when set.
    pub fn from_env() -> Self {
        match std::env::var_os(STORAGE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(PathBuf::from(dir)),
            _ => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        self.sheets.validate()?;
        Ok(())
    }

    pub fn master_path(&self) -> PathBuf {
        self.storage_dir.join(&self.master_file)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage_dir.join(&self.uploads_dir)
    }

    pub fn backups_path(&self) -> PathBuf {
        self.storage_dir.join(&self.backups_dir)
    }
}
