//! Layer tree snapshot and the filtered view the exporter walks.

pub mod tree;
pub mod view;

pub use tree::{ElementId, LayerElement, LayerKind, LayerTree};
pub use view::{fallback_name, LayerTreeView, FALLBACK_NAME};

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod view_tests;
