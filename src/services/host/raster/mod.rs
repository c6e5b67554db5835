//! Reference host working on plain RGBA buffers.
//!
//! The source document is a [`RasterDocument`]; scratch images are
//! [`Canvas`] values. Files are encoded with the `image` crate, the encoder
//! being picked from the output file extension.

pub mod canvas;
pub mod document;

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};

pub use canvas::{Canvas, RasterItemId};
pub use document::{BlendMode, RasterDocument, RasterLayerId, RasterNode};

use canvas::{CanvasLayer, Content};

use super::{HostError, ImageHost, LayerSource, RunMode, SaveFailure};

#[derive(Debug)]
pub struct RasterHost {
    document: RasterDocument,
    live_images: usize,
}

impl RasterHost {
    pub fn new(document: RasterDocument) -> Self {
        Self {
            document,
            live_images: 0,
        }
    }

    pub fn document(&self) -> &RasterDocument {
        &self.document
    }

    /// Scratch images created and not yet deleted.
    pub fn live_images(&self) -> usize {
        self.live_images
    }

    fn copy_node(&self, id: RasterLayerId, canvas: &mut Canvas) -> Result<CanvasLayer, HostError> {
        let node = self
            .document
            .node(id)
            .ok_or_else(|| HostError::new("insert_layer_copy", format!("unknown layer {id:?}")))?;

        let content = match &node.pixels {
            Some(pixels) => Content::Pixels(pixels.clone()),
            None => {
                let mut members = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    members.push(self.copy_node(*child, canvas)?);
                }
                Content::Group(members)
            }
        };

        Ok(CanvasLayer {
            id: canvas.next_id(),
            content,
            offset: node.offset,
            visible: node.visible,
            blend: node.blend,
        })
    }
}

fn missing_item(operation: &'static str, item: RasterItemId) -> HostError {
    HostError::new(operation, format!("{item:?} is not in the image"))
}

impl LayerSource for RasterHost {
    type Handle = RasterLayerId;

    fn top_level_layers(&self) -> Vec<RasterLayerId> {
        self.document.roots().to_vec()
    }

    fn children(&self, layer: &RasterLayerId) -> Vec<RasterLayerId> {
        self.document
            .node(*layer)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn is_group(&self, layer: &RasterLayerId) -> bool {
        self.document.node(*layer).is_some_and(RasterNode::is_group)
    }

    fn is_visible(&self, layer: &RasterLayerId) -> bool {
        self.document.node(*layer).is_some_and(|node| node.visible)
    }

    fn name(&self, layer: &RasterLayerId) -> String {
        self.document
            .node(*layer)
            .map(|node| node.name.clone())
            .unwrap_or_default()
    }
}

impl ImageHost for RasterHost {
    type Image = Canvas;
    type Item = RasterItemId;

    fn create_image(&mut self) -> Result<Canvas, HostError> {
        self.live_images += 1;
        Ok(Canvas::new(self.document.width(), self.document.height()))
    }

    fn delete_image(&mut self, _image: Canvas) {
        self.live_images = self.live_images.saturating_sub(1);
    }

    fn insert_layer_copy(
        &mut self,
        image: &mut Canvas,
        layer: &RasterLayerId,
        position: usize,
    ) -> Result<RasterItemId, HostError> {
        let mut copy = self.copy_node(*layer, image)?;
        copy.visible = true;
        let id = copy.id;
        image.insert(position, copy);
        Ok(id)
    }

    fn is_group_item(&self, image: &Canvas, item: &RasterItemId) -> bool {
        image.layer(*item).is_some_and(CanvasLayer::is_group)
    }

    fn merge_group(&mut self, image: &mut Canvas, item: RasterItemId) -> Result<RasterItemId, HostError> {
        image.merge_group(item).ok_or_else(|| missing_item("merge_group", item))
    }

    fn merge_visible(&mut self, image: &mut Canvas) -> Result<RasterItemId, HostError> {
        Ok(image.merge_visible())
    }

    fn reset_blend_mode(&mut self, image: &mut Canvas, item: &RasterItemId) -> Result<(), HostError> {
        let layer = image
            .layer_mut(*item)
            .ok_or_else(|| missing_item("reset_blend_mode", *item))?;
        layer.blend = BlendMode::Normal;
        Ok(())
    }

    fn resize_image_to_layers(&mut self, image: &mut Canvas) -> Result<(), HostError> {
        image.resize_to_layers();
        Ok(())
    }

    fn autocrop_image(&mut self, image: &mut Canvas, item: &RasterItemId) -> Result<(), HostError> {
        if image.layer(*item).is_none() {
            return Err(missing_item("autocrop_image", *item));
        }
        image.autocrop_to(*item);
        Ok(())
    }

    fn autocrop_layer(&mut self, image: &mut Canvas, item: &RasterItemId) -> Result<(), HostError> {
        if image.autocrop_layer(*item) {
            Ok(())
        } else {
            Err(missing_item("autocrop_layer", *item))
        }
    }

    fn resize_layer_to_image(&mut self, image: &mut Canvas, item: &RasterItemId) -> Result<(), HostError> {
        if image.resize_layer_to_canvas(*item) {
            Ok(())
        } else {
            Err(missing_item("resize_layer_to_image", *item))
        }
    }

    fn remove_layer(&mut self, image: &mut Canvas, item: RasterItemId) -> Result<(), HostError> {
        if image.remove(item) {
            Ok(())
        } else {
            Err(missing_item("remove_layer", item))
        }
    }

    fn save(
        &mut self,
        image: &Canvas,
        item: &RasterItemId,
        path: &Path,
        base_name: &str,
        _run_mode: RunMode,
    ) -> Result<(), SaveFailure> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let format = match ImageFormat::from_extension(&extension) {
            Some(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP)) => format,
            _ => {
                return Err(SaveFailure::Failed(format!(
                    "no encoder for file extension '{extension}'"
                )))
            }
        };

        let pixels = image
            .render(*item)
            .ok_or_else(|| SaveFailure::Failed(format!("layer {item:?} is not in the image")))?;
        let output = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(pixels).to_rgb8()),
            _ => DynamicImage::ImageRgba8(pixels),
        };

        let mut buffer = Cursor::new(Vec::new());
        output
            .write_to(&mut buffer, format)
            .map_err(|e| SaveFailure::Failed(format!("Failed to encode '{base_name}': {e}")))?;
        fs::write(path, buffer.into_inner())
            .map_err(|e| SaveFailure::Failed(format!("Failed to write '{}': {e}", path.display())))?;

        log::debug!("Saved {} ({}x{})", path.display(), image.width(), image.height());
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/raster_tests.rs"]
mod tests;
