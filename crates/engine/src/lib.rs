pub mod bundle;
pub mod error;
pub mod jobs;
pub mod serializer;

pub use bundle::BundleExport;
pub use error::{EngineError, ErrorKind};
pub use jobs::Page;
pub use serializer::WriteSerializer;

use std::path::PathBuf;
use std::sync::Arc;

use opsbook_core::{Clock, Record, SheetNames, SystemClock};
use opsbook_storage::{IngestReport, MasterStatus, WorkbookStorage};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub ingest: IngestReport,
    pub master: MasterStatus,
}

/// The record store's public surface. Every operation is queued on one
/// [`WriteSerializer`], so at most one load/modify/save cycle touches the
/// master at a time. Cloning shares the queue.
pub struct Engine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    serializer: WriteSerializer,
}

impl<S> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            serializer: self.serializer.clone(),
        }
    }
}

impl<S: WorkbookStorage + 'static> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
            serializer: WriteSerializer::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn names(&self) -> &SheetNames {
        self.store.names()
    }

    pub fn master_path(&self) -> PathBuf {
        self.store.master_path()
    }

    async fn run<T, F>(&self, job: F) -> Result<T, EngineError>
    where
        F: FnOnce(&S) -> Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        self.serializer.submit(move || job(&*store)).await
    }

    /// One page of `sheet`, 1-indexed. Page 0 is treated as 1; the size
    /// defaults to 50 and is clamped to 1..=500.
    pub async fn list_rows(
        &self,
        sheet: &str,
        page: usize,
        page_size: Option<usize>,
    ) -> Result<Page, EngineError> {
        let sheet = sheet.to_string();
        let today = self.clock.today();
        self.run(move |store| jobs::list_rows(store, &sheet, page, page_size, today))
            .await
    }

    /// Append a row. Id-bearing sheets get the next id unless `data` supplies
    /// one; `id_prefix` is only consulted for sheets without a fixed prefix.
    pub async fn create_row(
        &self,
        sheet: &str,
        id_prefix: Option<&str>,
        data: Record,
    ) -> Result<Record, EngineError> {
        let sheet = sheet.to_string();
        let id_prefix = id_prefix.map(str::to_string);
        let today = self.clock.today();
        self.run(move |store| jobs::create_row(store, &sheet, id_prefix.as_deref(), data, today))
            .await
    }

    /// Partial update of the row keyed by `id` (by Location on the sites sheet).
    pub async fn update_row(&self, sheet: &str, id: &str, patch: Record) -> Result<Record, EngineError> {
        let sheet = sheet.to_string();
        let id = id.to_string();
        let today = self.clock.today();
        self.run(move |store| jobs::update_row(store, &sheet, &id, patch, today))
            .await
    }

    pub async fn delete_row(&self, sheet: &str, id: &str) -> Result<(), EngineError> {
        let sheet = sheet.to_string();
        let id = id.to_string();
        self.run(move |store| jobs::delete_row(store, &sheet, &id)).await
    }

    pub async fn export_employee_bundle(&self, employee_id: &str) -> Result<BundleExport, EngineError> {
        let employee_id = employee_id.to_string();
        let today = self.clock.today();
        self.run(move |store| jobs::export_bundle(store, &employee_id, today))
            .await
    }

    /// Promote a pending upload, if any, without touching rows.
    pub async fn ingest(&self) -> Result<IngestReport, EngineError> {
        self.run(|store| Ok(store.ingest_uploads()?)).await
    }

    pub async fn status(&self) -> Result<StoreStatus, EngineError> {
        self.run(|store| {
            let ingest = store.ingest_uploads()?;
            let master = store.ensure_exists()?;
            Ok(StoreStatus { ingest, master })
        })
        .await
    }

    pub async fn sheet_names(&self) -> Result<Vec<String>, EngineError> {
        self.run(|store| jobs::sheet_names(store)).await
    }
}
