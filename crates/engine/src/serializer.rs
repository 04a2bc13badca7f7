//! Single-flight FIFO queue in front of the master workbook.
//!
//! `tokio::sync::Mutex` hands out its lock in the order callers asked for
//! it, which gives the queue its ordering. The guard travels into the
//! blocking task, so a job keeps the slot until it finishes even if the
//! caller stops waiting for it.

use std::sync::Arc;

use opsbook_core::JobId;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::EngineError;

#[derive(Debug, Default, Clone)]
pub struct WriteSerializer {
    slot: Arc<Mutex<()>>,
}

impl WriteSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` and wait for its result. A failing or panicking job
    /// rejects only its own caller; the next job starts right after.
    pub async fn submit<T, F>(&self, job: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
        T: Send + 'static,
    {
        let job_id = JobId::new();
        debug!(event = "job_queued", job = %job_id);
        let slot = Arc::clone(&self.slot).lock_owned().await;
        debug!(event = "job_started", job = %job_id);

        let outcome = tokio::task::spawn_blocking(move || {
            let _slot = slot;
            job()
        })
        .await;

        match outcome {
            Ok(result) => {
                debug!(event = "job_finished", job = %job_id, ok = result.is_ok());
                result
            }
            Err(join) => {
                error!(event = "job_panicked", job = %job_id, error = %join);
                Err(EngineError::JobPanicked(join.to_string()))
            }
        }
    }
}
