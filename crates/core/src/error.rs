use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid sheet name {name:?}: {reason}")]
    InvalidSheetName { name: String, reason: &'static str },

    #[error("duplicate sheet name in configuration: {0}")]
    DuplicateSheetName(String),

    #[error("invalid id prefix: {0:?}")]
    InvalidIdPrefix(String),

    #[error("id sequence for prefix {0:?} is exhausted")]
    SequenceExhausted(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
