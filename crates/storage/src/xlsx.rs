use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use opsbook_core::schema::default_workbook;
use opsbook_core::{SheetNames, Workbook};
use tracing::{debug, info, warn};

use crate::atomic::{atomic_copy, atomic_write_bytes};
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::format::{read_workbook, write_workbook};
use crate::traits::{IngestReport, MasterStatus, WorkbookStorage};

/// The master workbook on disk, plus its uploads and backups directories.
pub struct XlsxStore {
    config: StoreConfig,
}

impl XlsxStore {
    pub fn open(config: StoreConfig) -> Result<Self, StorageError> {
        config.validate()?;
        let store = Self { config };
        store.ensure_dirs()?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.config.storage_dir)?;
        fs::create_dir_all(self.config.uploads_path())?;
        fs::create_dir_all(self.config.backups_path())?;
        Ok(())
    }

    /// Most recently modified regular file in the uploads directory.
    fn newest_upload(&self) -> Result<Option<(PathBuf, SystemTime)>, StorageError> {
        let mut newest: Option<(PathBuf, SystemTime)> = None;
        for entry in fs::read_dir(self.config.uploads_path())? {
            let entry = entry?;
            let meta = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            if newest.as_ref().is_none_or(|(_, t)| modified > *t) {
                newest = Some((entry.path(), modified));
            }
        }
        Ok(newest)
    }

    fn backup_master(&self, master: &Path) -> Result<PathBuf, StorageError> {
        let stem = master
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".into());
        let ext = master
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "xlsx".into());
        let stamp = Local::now().format("%Y-%m-%d-%H%M%S");
        let dest = self
            .config
            .backups_path()
            .join(format!("{stem}-{stamp}.{ext}"));
        atomic_copy(master, &dest)?;
        Ok(dest)
    }

    fn promote(&self, upload: &Path, report: &mut IngestReport) -> Result<(), StorageError> {
        // Refuse files we could not read back as a workbook.
        read_workbook(upload)?;
        let master = self.config.master_path();
        if master.exists() {
            report.backup = Some(self.backup_master(&master)?);
        }
        atomic_copy(upload, &master)?;
        Ok(())
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl WorkbookStorage for XlsxStore {
    fn names(&self) -> &SheetNames {
        &self.config.sheets
    }

    fn ingest_uploads(&self) -> Result<IngestReport, StorageError> {
        self.ensure_dirs()?;
        let mut report = IngestReport::default();
        let Some((upload, upload_mtime)) = self.newest_upload()? else {
            return Ok(report);
        };

        let master_mtime = modified(&self.config.master_path());
        if master_mtime.is_some_and(|m| upload_mtime <= m) {
            debug!(event = "upload_not_newer", upload = %upload.display());
            return Ok(report);
        }

        match self.promote(&upload, &mut report) {
            Ok(()) => {
                info!(
                    event = "upload_promoted",
                    from = %upload.display(),
                    backup = ?report.backup,
                );
                report.promoted = true;
                report.from = Some(upload);
            }
            Err(err) => {
                warn!(event = "upload_promotion_failed", from = %upload.display(), error = %err);
                report.error = Some(err.to_string());
            }
        }
        Ok(report)
    }

    fn ensure_exists(&self) -> Result<MasterStatus, StorageError> {
        let path = self.config.master_path();
        let mut created = false;
        if !path.exists() {
            let bytes = write_workbook(&default_workbook(&self.config.sheets))?;
            atomic_write_bytes(&path, &bytes)?;
            info!(event = "master_created", path = %path.display());
            created = true;
        }
        let bytes = fs::metadata(&path)?.len();
        Ok(MasterStatus {
            path,
            bytes,
            created,
        })
    }

    fn load(&self) -> Result<Workbook, StorageError> {
        read_workbook(&self.config.master_path())
    }

    fn atomic_save(&self, workbook: &Workbook) -> Result<(), StorageError> {
        let bytes = write_workbook(workbook)?;
        let path = self.config.master_path();
        atomic_write_bytes(&path, &bytes)?;
        debug!(event = "master_saved", path = %path.display(), bytes = bytes.len());
        Ok(())
    }

    fn master_path(&self) -> PathBuf {
        self.config.master_path()
    }
}
