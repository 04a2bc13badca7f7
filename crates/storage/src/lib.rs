pub mod atomic;
pub mod config;
pub mod error;
pub mod format;
pub mod memory;
pub mod traits;
pub mod xlsx;

pub use config::StoreConfig;
pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::*;
pub use xlsx::XlsxStore;
