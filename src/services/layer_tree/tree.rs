//! Arena snapshot of the host's layer tree.

use std::fmt;

use crate::services::host::LayerSource;
use crate::services::naming;

/// Index of an element in a [`LayerTree`]. Stable for the lifetime of the tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    /// Returns the raw slot index (for diagnostics only).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Layer,
    NonemptyGroup,
    EmptyGroup,
}

/// One node of the tree as seen by the exporter.
///
/// `kind`, `level`, visibility and the host handle are fixed at creation; only
/// the name changes while an export is being prepared.
#[derive(Debug, Clone)]
pub struct LayerElement<H> {
    id: ElementId,
    kind: LayerKind,
    name: String,
    orig_name: String,
    level: usize,
    path_visible: bool,
    parent: Option<ElementId>,
    handle: H,
}

impl<H> LayerElement<H> {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn is_exportable(&self) -> bool {
        matches!(self.kind, LayerKind::Layer | LayerKind::NonemptyGroup)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Name as reported by the host, before any mutation.
    pub fn orig_name(&self) -> &str {
        &self.orig_name
    }

    /// Nesting depth, 0 for top-level elements.
    pub fn level(&self) -> usize {
        self.level
    }

    /// True iff the element and all of its ancestors are visible.
    pub fn is_path_visible(&self) -> bool {
        self.path_visible
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Lowercased extension of the current name, or an empty string.
    pub fn file_extension(&self) -> String {
        naming::file_extension(&self.name)
    }

    /// Replace or add (`Some`), or strip (`None`) the extension of the name.
    pub fn set_file_extension(&mut self, extension: Option<&str>) {
        self.name = naming::with_file_extension(&self.name, extension);
    }
}

/// Depth-first, pre-order list of every element of the host tree.
#[derive(Debug, Clone)]
pub struct LayerTree<H> {
    elements: Vec<LayerElement<H>>,
}

impl<H: Clone> LayerTree<H> {
    /// Snapshot `source`, visiting children in the host's stacking order.
    pub fn from_source<S>(source: &S) -> Self
    where
        S: LayerSource<Handle = H> + ?Sized,
    {
        let mut tree = Self {
            elements: Vec::new(),
        };

        // (handle, parent, level, parent_path_visible), reversed so the top
        // of the stack is the next element in pre-order.
        let mut pending: Vec<(H, Option<ElementId>, usize, bool)> = source
            .top_level_layers()
            .into_iter()
            .rev()
            .map(|handle| (handle, None, 0, true))
            .collect();

        while let Some((handle, parent, level, parent_visible)) = pending.pop() {
            let id = ElementId(tree.elements.len() as u32);
            let path_visible = parent_visible && source.is_visible(&handle);
            let name = source.name(&handle);

            let children = if source.is_group(&handle) {
                source.children(&handle)
            } else {
                Vec::new()
            };
            let kind = match (source.is_group(&handle), children.is_empty()) {
                (false, _) => LayerKind::Layer,
                (true, false) => LayerKind::NonemptyGroup,
                (true, true) => LayerKind::EmptyGroup,
            };

            for child in children.into_iter().rev() {
                pending.push((child, Some(id), level + 1, path_visible));
            }

            tree.elements.push(LayerElement {
                id,
                kind,
                orig_name: name.clone(),
                name,
                level,
                path_visible,
                parent,
                handle,
            });
        }

        tree
    }
}

impl<H> LayerTree<H> {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&LayerElement<H>> {
        self.elements.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerElement<H>> {
        self.elements.iter()
    }

    pub(crate) fn elements_slice(&self) -> &[LayerElement<H>] {
        &self.elements
    }

    pub(crate) fn elements_slice_mut(&mut self) -> &mut [LayerElement<H>] {
        &mut self.elements
    }

    /// Ancestors of `id`, outermost first.
    pub fn ancestors(&self, id: ElementId) -> Vec<&LayerElement<H>> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|element| element.parent);
        while let Some(parent_id) = current {
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            chain.push(parent);
            current = parent.parent;
        }
        chain.reverse();
        chain
    }
}
