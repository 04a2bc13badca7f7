pub mod cell;
pub mod codec;
pub mod derived;
pub mod error;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod record;
pub mod schema;
pub mod sequence;

pub use cell::CellValue;
pub use derived::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
pub use ids::JobId;
pub use model::{Sheet, Workbook};
pub use record::Record;
pub use schema::{SheetKind, SheetNames};
