pub mod services;
pub mod types;
#[cfg(test)]
pub mod test_utils;

pub use services::config::{load_settings, ExportSettings};
pub use services::export::{run, LayerExporter, RunOutcome, StopHandle};
pub use types::errors::{ExportError, ExportResult};
