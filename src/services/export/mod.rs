//! The export pipeline: per-layer compositing, the save ladder and the
//! orchestrator driving them.

pub mod compositor;
pub mod exporter;
pub mod extensions;
pub mod progress;
pub mod status;

pub use exporter::{run, LayerExporter, ProcessedLayer, RunOutcome, StopHandle};
pub use progress::{LogProgress, NullProgress, ProgressSink};
