//! Filtered view over a [`LayerTree`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::services::filter::{FilterOwner, LayerRule, MatchType, ObjectFilter};
use crate::services::naming::{self, SuffixPlacement};
use crate::types::errors::ExportError;

use super::tree::{ElementId, LayerElement, LayerTree};

/// Name substituted for layers whose name cannot be used as a file name.
pub const FALLBACK_NAME: &str = "Untitled";

/// A [`LayerTree`] seen through an [`ObjectFilter`].
///
/// Iteration yields only the elements that currently pass the filter, in the
/// tree's pre-order. The view also remembers every name it has finalized per
/// output directory so two elements never end up with the same file path.
#[derive(Debug)]
pub struct LayerTreeView<H> {
    tree: LayerTree<H>,
    filter: ObjectFilter<LayerRule>,
    claimed_names: HashMap<PathBuf, HashSet<String>>,
}

impl<H> LayerTreeView<H> {
    pub fn new(tree: LayerTree<H>) -> Self {
        Self {
            tree,
            filter: ObjectFilter::new(MatchType::All),
            claimed_names: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &LayerTree<H> {
        &self.tree
    }

    pub fn filter(&self) -> &ObjectFilter<LayerRule> {
        &self.filter
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerElement<H>> {
        self.tree
            .iter()
            .filter(move |element| self.filter.is_match(*element))
    }

    /// Ids of the elements passing the filter right now.
    pub fn ids(&self) -> Vec<ElementId> {
        self.iter().map(LayerElement::id).collect()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// # Panics
    /// If `id` does not belong to this view's tree.
    pub fn element(&self, id: ElementId) -> &LayerElement<H> {
        &self.tree.elements_slice()[id.index()]
    }

    /// # Panics
    /// If `id` does not belong to this view's tree.
    pub fn element_mut(&mut self, id: ElementId) -> &mut LayerElement<H> {
        &mut self.tree.elements_slice_mut()[id.index()]
    }

    /// Directory that holds the element's file. Group names are sanitized so
    /// every component stays a single directory below `output_directory`.
    fn parent_directory(&self, id: ElementId, output_directory: &Path, include_layer_path: bool) -> PathBuf {
        let mut directory = output_directory.to_path_buf();
        if include_layer_path {
            for ancestor in self.tree.ancestors(id) {
                directory.push(fallback_name(ancestor.name()));
            }
        }
        directory
    }

    /// Output path of the element. Pure; nothing is claimed or mutated.
    pub fn file_path(&self, id: ElementId, output_directory: &Path, include_layer_path: bool) -> PathBuf {
        self.parent_directory(id, output_directory, include_layer_path)
            .join(self.element(id).name())
    }

    /// Make the element's name unique among the names already finalized in the
    /// same directory, rename the element, and claim the name.
    pub fn finalize_name(
        &mut self,
        id: ElementId,
        output_directory: &Path,
        include_layer_path: bool,
        placement: SuffixPlacement,
    ) -> &str {
        let directory = self.parent_directory(id, output_directory, include_layer_path);
        let claimed = self.claimed_names.entry(directory).or_default();

        let unique = naming::uniquify_name(self.tree.elements_slice()[id.index()].name(), placement, |name| {
            claimed.contains(&name.to_lowercase())
        });
        claimed.insert(unique.to_lowercase());

        let element = &mut self.tree.elements_slice_mut()[id.index()];
        element.set_name(unique);
        element.name()
    }

    /// Fails with [`ExportError::InvalidName`] when the element's name is empty
    /// or not usable as a file name.
    pub fn validate_name(&self, id: ElementId) -> Result<(), ExportError> {
        let name = self.element(id).name();
        if name.is_empty() {
            return Err(ExportError::InvalidName("layer name is empty".to_string()));
        }
        if sanitize_filename::sanitize(name) != name {
            return Err(ExportError::InvalidName(format!(
                "'{name}' contains characters not allowed in file names"
            )));
        }
        Ok(())
    }
}

/// Sanitized version of `name`, or [`FALLBACK_NAME`] if nothing usable is left.
pub fn fallback_name(name: &str) -> String {
    let sanitized = sanitize_filename::sanitize(name);
    if sanitized.trim().is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

impl<H> FilterOwner<LayerRule> for LayerTreeView<H> {
    fn filter_mut(&mut self) -> &mut ObjectFilter<LayerRule> {
        &mut self.filter
    }
}
