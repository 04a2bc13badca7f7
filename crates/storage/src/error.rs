use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook read error: {0}")]
    Read(#[from] calamine::Error),

    #[error("workbook write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("sheet {sheet:?} exceeds workbook limits at row {row}, column {col}")]
    TooLarge { sheet: String, row: usize, col: usize },

    #[error("configuration error: {0}")]
    Config(#[from] opsbook_core::CoreError),
}
