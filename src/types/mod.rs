pub mod errors;

pub use errors::{ExportError, ExportResult};
