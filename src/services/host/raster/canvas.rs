//! Scratch canvas used by [`super::RasterHost`] while preparing a layer.
//!
//! Layers are kept topmost first. Offsets are signed so layers may extend
//! past the canvas edges until the canvas is resized or cropped.

use std::fmt;

use image::{imageops, Rgba, RgbaImage};

use super::document::BlendMode;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterItemId(pub(crate) u32);

impl fmt::Debug for RasterItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterItemId({})", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Pixels(RgbaImage),
    /// Topmost first.
    Group(Vec<CanvasLayer>),
}

#[derive(Debug, Clone)]
pub(crate) struct CanvasLayer {
    pub(crate) id: RasterItemId,
    pub(crate) content: Content,
    pub(crate) offset: (i64, i64),
    pub(crate) visible: bool,
    pub(crate) blend: BlendMode,
}

/// Axis-aligned rectangle in canvas coordinates. `right`/`bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub(crate) left: i64,
    pub(crate) top: i64,
    pub(crate) right: i64,
    pub(crate) bottom: i64,
}

impl Bounds {
    fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    fn union(self, other: Bounds) -> Bounds {
        Bounds {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

impl CanvasLayer {
    pub(crate) fn is_group(&self) -> bool {
        matches!(self.content, Content::Group(_))
    }

    /// The layer rendered to a single buffer, with its position. `None` when
    /// nothing visible is inside.
    pub(crate) fn flatten(&self) -> Option<(RgbaImage, (i64, i64))> {
        match &self.content {
            Content::Pixels(pixels) => Some((pixels.clone(), self.offset)),
            Content::Group(members) => {
                let rendered: Vec<_> = members
                    .iter()
                    .filter(|member| member.visible)
                    .filter_map(|member| member.flatten().map(|(pixels, offset)| (pixels, offset, member.blend)))
                    .collect();
                let bounds = rendered
                    .iter()
                    .map(|(pixels, offset, _)| bounds_of(pixels, *offset))
                    .reduce(Bounds::union)?;

                let mut target = RgbaImage::new(bounds.width().max(1), bounds.height().max(1));
                for (pixels, offset, blend) in rendered.iter().rev() {
                    composite(&mut target, (bounds.left, bounds.top), pixels, *offset, *blend);
                }
                Some((target, (bounds.left, bounds.top)))
            }
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        match &self.content {
            Content::Pixels(pixels) => Some(bounds_of(pixels, self.offset)),
            Content::Group(members) => members.iter().filter_map(CanvasLayer::bounds).reduce(Bounds::union),
        }
    }

    fn translate(&mut self, dx: i64, dy: i64) {
        self.offset = (self.offset.0 + dx, self.offset.1 + dy);
        if let Content::Group(members) = &mut self.content {
            for member in members {
                member.translate(dx, dy);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Canvas {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) layers: Vec<CanvasLayer>,
    next_item: u32,
}

impl Canvas {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            layers: Vec::new(),
            next_item: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub(crate) fn next_id(&mut self) -> RasterItemId {
        let id = RasterItemId(self.next_item);
        self.next_item += 1;
        id
    }

    pub(crate) fn position(&self, item: RasterItemId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == item)
    }

    pub(crate) fn layer(&self, item: RasterItemId) -> Option<&CanvasLayer> {
        self.layers.iter().find(|layer| layer.id == item)
    }

    pub(crate) fn layer_mut(&mut self, item: RasterItemId) -> Option<&mut CanvasLayer> {
        self.layers.iter_mut().find(|layer| layer.id == item)
    }

    pub(crate) fn insert(&mut self, position: usize, layer: CanvasLayer) {
        let position = position.min(self.layers.len());
        self.layers.insert(position, layer);
    }

    /// Replace a group layer by its flattened pixels. Keeps the stack position
    /// and attributes. Returns the id of the merged layer.
    pub(crate) fn merge_group(&mut self, item: RasterItemId) -> Option<RasterItemId> {
        let index = self.position(item)?;
        let id = self.next_id();
        let layer = &mut self.layers[index];
        let (pixels, offset) = layer
            .flatten()
            .unwrap_or_else(|| (RgbaImage::new(1, 1), layer.offset));
        layer.id = id;
        layer.content = Content::Pixels(pixels);
        layer.offset = offset;
        Some(id)
    }

    /// Composite every visible layer into one canvas-sized layer placed on top.
    pub(crate) fn merge_visible(&mut self) -> RasterItemId {
        let mut target = RgbaImage::new(self.width, self.height);
        let (visible, hidden): (Vec<_>, Vec<_>) = self.layers.drain(..).partition(|layer| layer.visible);
        for layer in visible.iter().rev() {
            if let Some((pixels, offset)) = layer.flatten() {
                composite(&mut target, (0, 0), &pixels, offset, layer.blend);
            }
        }

        let id = self.next_id();
        self.layers = hidden;
        self.layers.insert(
            0,
            CanvasLayer {
                id,
                content: Content::Pixels(target),
                offset: (0, 0),
                visible: true,
                blend: BlendMode::Normal,
            },
        );
        id
    }

    /// Resize the canvas to the union of all layers.
    pub(crate) fn resize_to_layers(&mut self) {
        let Some(bounds) = self.layers.iter().filter_map(CanvasLayer::bounds).reduce(Bounds::union) else {
            return;
        };
        self.crop_to(bounds);
    }

    /// Crop the canvas to the non-transparent area of `item`.
    pub(crate) fn autocrop_to(&mut self, item: RasterItemId) -> bool {
        let Some(bounds) = self
            .layer(item)
            .and_then(CanvasLayer::flatten)
            .and_then(|(pixels, offset)| opaque_bounds(&pixels, offset))
        else {
            return false;
        };
        self.crop_to(bounds);
        true
    }

    /// Shrink `item` to its non-transparent area.
    pub(crate) fn autocrop_layer(&mut self, item: RasterItemId) -> bool {
        let Some(layer) = self.layer_mut(item) else {
            return false;
        };
        let Content::Pixels(pixels) = &layer.content else {
            return false;
        };
        let Some(bounds) = opaque_bounds(pixels, (0, 0)) else {
            return true;
        };
        let cropped = imageops::crop_imm(
            pixels,
            bounds.left as u32,
            bounds.top as u32,
            bounds.width(),
            bounds.height(),
        )
        .to_image();
        layer.offset = (layer.offset.0 + bounds.left, layer.offset.1 + bounds.top);
        layer.content = Content::Pixels(cropped);
        true
    }

    /// Give `item` the canvas size, keeping its pixels where they are.
    pub(crate) fn resize_layer_to_canvas(&mut self, item: RasterItemId) -> bool {
        let (width, height) = (self.width, self.height);
        let Some(layer) = self.layer_mut(item) else {
            return false;
        };
        let Some((pixels, offset)) = layer.flatten() else {
            return false;
        };
        let mut target = RgbaImage::new(width, height);
        imageops::replace(&mut target, &pixels, offset.0, offset.1);
        layer.content = Content::Pixels(target);
        layer.offset = (0, 0);
        true
    }

    pub(crate) fn remove(&mut self, item: RasterItemId) -> bool {
        match self.position(item) {
            Some(index) => {
                self.layers.remove(index);
                true
            }
            None => false,
        }
    }

    /// `item` alone on a transparent canvas-sized buffer.
    pub(crate) fn render(&self, item: RasterItemId) -> Option<RgbaImage> {
        let layer = self.layer(item)?;
        let mut target = RgbaImage::new(self.width, self.height);
        if let Some((pixels, offset)) = layer.flatten() {
            composite(&mut target, (0, 0), &pixels, offset, BlendMode::Normal);
        }
        Some(target)
    }

    fn crop_to(&mut self, bounds: Bounds) {
        for layer in &mut self.layers {
            layer.translate(-bounds.left, -bounds.top);
        }
        self.width = bounds.width().max(1);
        self.height = bounds.height().max(1);
    }
}

fn bounds_of(pixels: &RgbaImage, offset: (i64, i64)) -> Bounds {
    Bounds {
        left: offset.0,
        top: offset.1,
        right: offset.0 + i64::from(pixels.width()),
        bottom: offset.1 + i64::from(pixels.height()),
    }
}

/// Bounding box of the pixels with non-zero alpha, shifted by `offset`.
pub(crate) fn opaque_bounds(pixels: &RgbaImage, offset: (i64, i64)) -> Option<Bounds> {
    let mut found: Option<Bounds> = None;
    for (x, y, pixel) in pixels.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        let point = Bounds {
            left: offset.0 + i64::from(x),
            top: offset.1 + i64::from(y),
            right: offset.0 + i64::from(x) + 1,
            bottom: offset.1 + i64::from(y) + 1,
        };
        found = Some(match found {
            Some(bounds) => bounds.union(point),
            None => point,
        });
    }
    found
}

/// Draw `src` (at `src_offset`) over `dst` (whose origin is at `dst_origin`).
pub(crate) fn composite(
    dst: &mut RgbaImage,
    dst_origin: (i64, i64),
    src: &RgbaImage,
    src_offset: (i64, i64),
    blend: BlendMode,
) {
    let x = src_offset.0 - dst_origin.0;
    let y = src_offset.1 - dst_origin.1;
    match blend {
        BlendMode::Normal => imageops::overlay(dst, src, x, y),
        BlendMode::Multiply => {
            for (sx, sy, top) in src.enumerate_pixels() {
                let dx = x + i64::from(sx);
                let dy = y + i64::from(sy);
                if dx < 0 || dy < 0 || dx >= i64::from(dst.width()) || dy >= i64::from(dst.height()) {
                    continue;
                }
                let bottom = dst.get_pixel_mut(dx as u32, dy as u32);
                *bottom = multiply(*bottom, *top);
            }
        }
    }
}

fn multiply(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(top[3]);
    if alpha == 0 {
        return bottom;
    }
    let mut out = bottom;
    for channel in 0..3 {
        let b = u32::from(bottom[channel]);
        let product = b * u32::from(top[channel]) / 255;
        out[channel] = ((product * alpha + b * (255 - alpha)) / 255) as u8;
    }
    let bottom_alpha = u32::from(bottom[3]);
    out[3] = (alpha + bottom_alpha * (255 - alpha) / 255).min(255) as u8;
    out
}
