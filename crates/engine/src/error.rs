use opsbook_core::CoreError;
use opsbook_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("store job panicked: {0}")]
    JobPanicked(String),
}

/// Coarse classification for whatever sits in front of the engine
/// (an HTTP layer maps these to status codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DuplicateKey,
    NotFound,
    Schema,
    Storage,
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Schema(_) => ErrorKind::Schema,
            EngineError::Storage(_) => ErrorKind::Storage,
            EngineError::Core(CoreError::InvalidIdPrefix(_) | CoreError::InvalidData(_)) => {
                ErrorKind::Validation
            }
            EngineError::Core(_) => ErrorKind::Schema,
            EngineError::JobPanicked(_) => ErrorKind::Internal,
        }
    }
}
