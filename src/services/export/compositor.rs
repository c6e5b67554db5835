//! Builds the image that gets saved for one layer.
//!
//! Everything happens inside the run's scratch image through [`ImageHost`]
//! primitives; the source document is never touched.

use crate::services::config::ExportSettings;
use crate::services::host::{HostError, ImageHost};

/// The settings that shape a prepared layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeOptions {
    /// Keep the document size instead of fitting the image to the layer.
    pub use_image_size: bool,
    pub crop_to_background: bool,
    pub autocrop: bool,
    pub ignore_layer_modes: bool,
}

impl From<&ExportSettings> for CompositeOptions {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            use_image_size: settings.use_image_size,
            crop_to_background: settings.crop_to_background,
            autocrop: settings.autocrop,
            ignore_layer_modes: settings.ignore_layer_modes,
        }
    }
}

/// Copy `layer` (over copies of `backgrounds`) into `image` and crop/merge the
/// result. Returns the one item left to save; the caller removes it once the
/// save is done.
pub fn prepare_layer<H>(
    host: &mut H,
    image: &mut H::Image,
    layer: &H::Handle,
    backgrounds: &[H::Handle],
    options: CompositeOptions,
) -> Result<H::Item, HostError>
where
    H: ImageHost + ?Sized,
{
    let mut merged_background = None;
    if !backgrounds.is_empty() {
        for (position, background) in backgrounds.iter().enumerate() {
            insert_flat_copy(host, image, background, position)?;
        }
        if options.use_image_size {
            merged_background = Some(host.merge_visible(image)?);
        }
    }

    let item = insert_flat_copy(host, image, layer, 0)?;
    if options.ignore_layer_modes {
        host.reset_blend_mode(image, &item)?;
    }

    crop_and_merge(
        host,
        image,
        item,
        !backgrounds.is_empty(),
        merged_background,
        options,
    )
}

/// Insert a visible copy of `layer`, flattening groups.
fn insert_flat_copy<H>(
    host: &mut H,
    image: &mut H::Image,
    layer: &H::Handle,
    position: usize,
) -> Result<H::Item, HostError>
where
    H: ImageHost + ?Sized,
{
    let copy = host.insert_layer_copy(image, layer, position)?;
    if host.is_group_item(image, &copy) {
        host.merge_group(image, copy)
    } else {
        Ok(copy)
    }
}

fn crop_and_merge<H>(
    host: &mut H,
    image: &mut H::Image,
    mut item: H::Item,
    has_backgrounds: bool,
    merged_background: Option<H::Item>,
    options: CompositeOptions,
) -> Result<H::Item, HostError>
where
    H: ImageHost + ?Sized,
{
    if !options.use_image_size {
        host.resize_image_to_layers(image)?;
        if options.crop_to_background {
            if has_backgrounds {
                item = host.merge_visible(image)?;
            }
            if options.autocrop {
                host.autocrop_image(image, &item)?;
            }
        } else {
            if options.autocrop {
                host.autocrop_image(image, &item)?;
            }
            if has_backgrounds {
                item = host.merge_visible(image)?;
            }
        }
        return Ok(item);
    }

    if options.autocrop {
        match (&merged_background, options.crop_to_background) {
            (Some(background), true) => host.autocrop_layer(image, background)?,
            _ => host.autocrop_layer(image, &item)?,
        }
    }
    if has_backgrounds {
        item = host.merge_visible(image)?;
    }
    host.resize_layer_to_image(image, &item)?;
    Ok(item)
}

#[cfg(test)]
#[path = "tests/compositor_tests.rs"]
mod tests;
