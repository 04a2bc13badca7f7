use std::path::PathBuf;

use opsbook_core::{SheetNames, Workbook};
use serde::Serialize;

use crate::error::StorageError;

/// Outcome of scanning the uploads directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub promoted: bool,
    pub from: Option<PathBuf>,
    pub backup: Option<PathBuf>,
    /// Set when a newer upload was found but could not be promoted.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterStatus {
    pub path: PathBuf,
    pub bytes: u64,
    /// True when this call created the master from the default layout.
    pub created: bool,
}

/// Backing store for the master workbook. Implementations are not expected
/// to coordinate concurrent writers themselves; every call is made from
/// inside a serialized job.
pub trait WorkbookStorage: Send + Sync {
    /// Sheet names this store's workbooks use.
    fn names(&self) -> &SheetNames;

    /// Promote the newest uploaded file over the master when it is newer.
    fn ingest_uploads(&self) -> Result<IngestReport, StorageError>;

    /// Create the master with the default layout if it does not exist yet.
    fn ensure_exists(&self) -> Result<MasterStatus, StorageError>;

    /// Parse the entire master into memory.
    fn load(&self) -> Result<Workbook, StorageError>;

    /// Replace the master with `workbook`, all or nothing.
    fn atomic_save(&self, workbook: &Workbook) -> Result<(), StorageError>;

    fn master_path(&self) -> PathBuf;
}
