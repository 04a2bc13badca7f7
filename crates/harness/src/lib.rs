pub mod fixtures;

pub use fixtures::{record, sample_master, sheet};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use opsbook_core::{FixedClock, Workbook};
use opsbook_engine::Engine;
use opsbook_storage::format::{read_workbook, read_workbook_bytes, write_workbook};
use opsbook_storage::{StoreConfig, XlsxStore};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// "Today" for every engine the harness builds, so open durations are stable.
pub fn test_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).expect("valid date")
}

static TRACING: Once = Once::new();

/// Route `tracing` output through the test writer. `RUST_LOG` selects levels.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An engine over a real master file in a scratch directory.
pub struct TestStore {
    pub dir: TempDir,
    pub engine: Engine<XlsxStore>,
}

impl TestStore {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let store = XlsxStore::open(StoreConfig::new(dir.path()))?;
        let engine = Engine::with_clock(store, Arc::new(FixedClock(test_today())));
        Ok(Self { dir, engine })
    }

    /// Start from `master` instead of a freshly created default file.
    pub fn with_master(master: &Workbook) -> Result<Self, Box<dyn Error>> {
        let test = Self::new()?;
        fs::write(test.master_path(), write_workbook(master)?)?;
        Ok(test)
    }

    pub fn config(&self) -> &StoreConfig {
        self.engine.store().config()
    }

    pub fn master_path(&self) -> PathBuf {
        self.engine.master_path()
    }

    /// The master as it is on disk right now.
    pub fn read_master(&self) -> Result<Workbook, Box<dyn Error>> {
        Ok(read_workbook(&self.master_path())?)
    }

    /// Drop `workbook` into the uploads directory as `file_name`.
    pub fn upload(&self, file_name: &str, workbook: &Workbook) -> Result<PathBuf, Box<dyn Error>> {
        let path = self.config().uploads_path().join(file_name);
        fs::write(&path, write_workbook(workbook)?)?;
        Ok(path)
    }

    /// Push a file's mtime into the past so a later write is clearly newer.
    pub fn age(&self, path: &Path, by: Duration) -> Result<(), Box<dyn Error>> {
        let file = fs::File::options().write(true).open(path)?;
        file.set_modified(SystemTime::now() - by)?;
        Ok(())
    }
}

/// Parse export bytes back into a workbook.
pub fn read_bundle(bytes: &[u8]) -> Result<Workbook, Box<dyn Error>> {
    Ok(read_workbook_bytes(bytes)?)
}
