//! Host capabilities consumed by the exporter.
//!
//! The host owns the document, its layers and the per-format encoders. The
//! exporter only reads the layer tree ([`LayerSource`]) and drives a scratch
//! image through the primitives of [`ImageHost`].

pub mod raster;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How much the encoder may ask the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// The encoder may show its options dialog.
    Interactive,
    /// Encoder defaults, no dialog.
    NonInteractive,
    /// Reuse the options chosen for the previous save of the same format.
    RepeatLastValues,
}

/// Why a save did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveFailure {
    /// The user dismissed the encoder dialog. Aborts the whole run.
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("{0}")]
    Failed(String),
}

/// A host primitive other than `save` failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Host operation '{operation}' failed: {reason}")]
pub struct HostError {
    pub operation: &'static str,
    pub reason: String,
}

impl HostError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// Read access to the host's layer tree.
pub trait LayerSource {
    /// Reference to a layer of the source document. The exporter never frees it.
    type Handle: Clone + PartialEq + fmt::Debug;

    /// Top-level layers, topmost first.
    fn top_level_layers(&self) -> Vec<Self::Handle>;
    /// Children of a group, topmost first. Empty for plain layers.
    fn children(&self, layer: &Self::Handle) -> Vec<Self::Handle>;
    fn is_group(&self, layer: &Self::Handle) -> bool;
    fn is_visible(&self, layer: &Self::Handle) -> bool;
    fn name(&self, layer: &Self::Handle) -> String;
}

/// Image manipulation and save primitives.
///
/// `Image` is a scratch image created for one export run; `Item` is a layer
/// living inside a scratch image.
pub trait ImageHost: LayerSource {
    type Image: fmt::Debug;
    type Item: Clone + PartialEq + fmt::Debug;

    /// New empty image with the dimensions of the source document.
    fn create_image(&mut self) -> Result<Self::Image, HostError>;
    fn delete_image(&mut self, image: Self::Image);

    /// Copy `layer` into `image` at stack `position` (0 = top) and make the
    /// copy visible.
    fn insert_layer_copy(
        &mut self,
        image: &mut Self::Image,
        layer: &Self::Handle,
        position: usize,
    ) -> Result<Self::Item, HostError>;
    fn is_group_item(&self, image: &Self::Image, item: &Self::Item) -> bool;
    /// Flatten a group copy into a single layer.
    fn merge_group(&mut self, image: &mut Self::Image, item: Self::Item) -> Result<Self::Item, HostError>;
    /// Merge every visible layer into one, clipped to the image.
    fn merge_visible(&mut self, image: &mut Self::Image) -> Result<Self::Item, HostError>;
    fn reset_blend_mode(&mut self, image: &mut Self::Image, item: &Self::Item) -> Result<(), HostError>;
    /// Grow or shrink the image to the union of its layers.
    fn resize_image_to_layers(&mut self, image: &mut Self::Image) -> Result<(), HostError>;
    /// Crop the whole image to the non-empty area of `item`.
    fn autocrop_image(&mut self, image: &mut Self::Image, item: &Self::Item) -> Result<(), HostError>;
    /// Crop `item` alone to its non-empty area.
    fn autocrop_layer(&mut self, image: &mut Self::Image, item: &Self::Item) -> Result<(), HostError>;
    fn resize_layer_to_image(&mut self, image: &mut Self::Image, item: &Self::Item) -> Result<(), HostError>;
    fn remove_layer(&mut self, image: &mut Self::Image, item: Self::Item) -> Result<(), HostError>;

    fn save(
        &mut self,
        image: &Self::Image,
        item: &Self::Item,
        path: &Path,
        base_name: &str,
        run_mode: RunMode,
    ) -> Result<(), SaveFailure>;
}

/// Scratch image owned for the duration of a run. Deleted on drop.
pub struct ScratchImage<'h, H: ImageHost + ?Sized> {
    host: &'h mut H,
    image: Option<H::Image>,
}

impl<'h, H: ImageHost + ?Sized> ScratchImage<'h, H> {
    pub fn new(host: &'h mut H) -> Result<Self, HostError> {
        let image = host.create_image()?;
        Ok(Self {
            host,
            image: Some(image),
        })
    }

    /// The host together with the scratch image it operates on.
    pub fn parts(&mut self) -> Result<(&mut H, &mut H::Image), HostError> {
        match self.image.as_mut() {
            Some(image) => Ok((&mut *self.host, image)),
            None => Err(HostError::new("scratch_image", "image already released")),
        }
    }
}

impl<H: ImageHost + ?Sized> Drop for ScratchImage<'_, H> {
    fn drop(&mut self) {
        if let Some(image) = self.image.take() {
            log::debug!("Releasing scratch image {image:?}");
            self.host.delete_image(image);
        }
    }
}

impl<H: ImageHost + ?Sized> fmt::Debug for ScratchImage<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchImage")
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}
