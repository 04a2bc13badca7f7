use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use opsbook_core::schema::default_workbook;
use opsbook_core::{SheetNames, Workbook};

use crate::error::StorageError;
use crate::traits::{IngestReport, MasterStatus, WorkbookStorage};

/// Keeps the master in memory. Used by tests that care about engine
/// behaviour rather than the file format.
pub struct MemoryStore {
    names: SheetNames,
    workbook: Mutex<Option<Workbook>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new(names: SheetNames) -> Self {
        Self {
            names,
            workbook: Mutex::new(None),
            saves: AtomicUsize::new(0),
        }
    }

    /// Start from an existing master instead of the default layout.
    pub fn with_workbook(names: SheetNames, workbook: Workbook) -> Self {
        Self {
            names,
            workbook: Mutex::new(Some(workbook)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed `atomic_save` calls.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The current master, if one exists.
    pub fn snapshot(&self) -> Option<Workbook> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Workbook>> {
        self.workbook.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(SheetNames::default())
    }
}

impl WorkbookStorage for MemoryStore {
    fn names(&self) -> &SheetNames {
        &self.names
    }

    fn ingest_uploads(&self) -> Result<IngestReport, StorageError> {
        Ok(IngestReport::default())
    }

    fn ensure_exists(&self) -> Result<MasterStatus, StorageError> {
        let mut guard = self.lock();
        let created = guard.is_none();
        if created {
            *guard = Some(default_workbook(&self.names));
        }
        Ok(MasterStatus {
            path: self.master_path(),
            bytes: 0,
            created,
        })
    }

    fn load(&self) -> Result<Workbook, StorageError> {
        self.lock().clone().ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "master workbook does not exist",
            ))
        })
    }

    fn atomic_save(&self, workbook: &Workbook) -> Result<(), StorageError> {
        *self.lock() = Some(workbook.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn master_path(&self) -> PathBuf {
        PathBuf::from(":memory:")
    }
}

#[cfg(test)]
mod tests {
    use opsbook_core::CellValue;

    use super::*;

    #[test]
    fn load_before_ensure_is_not_found() {
        let store = MemoryStore::default();
        assert!(matches!(store.load(), Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn ensure_creates_default_once_and_saves_are_counted() {
        let store = MemoryStore::default();
        assert!(store.ensure_exists().unwrap().created);
        assert!(!store.ensure_exists().unwrap().created);
        assert_eq!(store.saves(), 0);

        let mut wb = store.load().unwrap();
        wb.sheet_mut("Sites_List")
            .unwrap()
            .push_row(vec![CellValue::Text("Plant A".into())]);
        store.atomic_save(&wb).unwrap();

        assert_eq!(store.saves(), 1);
        assert_eq!(store.snapshot(), Some(wb));
    }
}
