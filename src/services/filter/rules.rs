//! Layer predicates.
//!
//! Each predicate is a pure function of a [`LayerElement`]. [`LayerRule`]
//! names them so they can be compared, removed and logged.

use crate::services::layer_tree::{LayerElement, LayerKind};
use crate::services::naming;

/// A predicate over `T` that a filter can hold.
pub trait Rule<T: ?Sized> {
    fn matches(&self, item: &T) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRule {
    IsLayer,
    IsNonemptyGroup,
    IsEmptyGroup,
    IsTopLevel,
    IsPathVisible,
    HasFileExtension,
    /// Compared case-insensitively.
    HasMatchingFileExtension(String),
    IsEnclosedInSquareBrackets,
    IsNotEnclosedInSquareBrackets,
}

impl<H> Rule<LayerElement<H>> for LayerRule {
    fn matches(&self, element: &LayerElement<H>) -> bool {
        match self {
            LayerRule::IsLayer => is_layer(element),
            LayerRule::IsNonemptyGroup => is_nonempty_group(element),
            LayerRule::IsEmptyGroup => is_empty_group(element),
            LayerRule::IsTopLevel => is_top_level(element),
            LayerRule::IsPathVisible => is_path_visible(element),
            LayerRule::HasFileExtension => has_file_extension(element),
            LayerRule::HasMatchingFileExtension(ext) => has_matching_file_extension(element, ext),
            LayerRule::IsEnclosedInSquareBrackets => is_enclosed_in_square_brackets(element),
            LayerRule::IsNotEnclosedInSquareBrackets => is_not_enclosed_in_square_brackets(element),
        }
    }
}

pub fn is_layer<H>(element: &LayerElement<H>) -> bool {
    element.kind() == LayerKind::Layer
}

pub fn is_nonempty_group<H>(element: &LayerElement<H>) -> bool {
    element.kind() == LayerKind::NonemptyGroup
}

pub fn is_empty_group<H>(element: &LayerElement<H>) -> bool {
    element.kind() == LayerKind::EmptyGroup
}

pub fn is_top_level<H>(element: &LayerElement<H>) -> bool {
    element.level() == 0
}

pub fn is_path_visible<H>(element: &LayerElement<H>) -> bool {
    element.is_path_visible()
}

pub fn has_file_extension<H>(element: &LayerElement<H>) -> bool {
    !element.file_extension().is_empty()
}

pub fn has_matching_file_extension<H>(element: &LayerElement<H>, extension: &str) -> bool {
    element.file_extension() == extension.trim_start_matches('.').to_lowercase()
}

pub fn is_enclosed_in_square_brackets<H>(element: &LayerElement<H>) -> bool {
    naming::is_enclosed_in_square_brackets(element.name())
}

pub fn is_not_enclosed_in_square_brackets<H>(element: &LayerElement<H>) -> bool {
    !is_enclosed_in_square_brackets(element)
}
