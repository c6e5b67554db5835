use image::{Rgba, RgbaImage};
use layer_export_lib::services::host::raster::{RasterDocument, RasterLayerId};
use std::path::Path;
use std::sync::Once;

static INIT: Once = Once::new();

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// 4x4 document: `[Bg]` (blue, full size), `Fg1` (red 1x1 at the origin) and
/// group `G` holding `Fg2` (red 2x2 at (2, 2)). Returns the handles of `Fg1`
/// and `Fg2` too.
pub fn scene_document() -> (RasterDocument, RasterLayerId, RasterLayerId) {
    let mut document = RasterDocument::new(4, 4);
    document
        .add_layer(None, "[Bg]", solid(4, 4, BLUE), (0, 0))
        .expect("add background");
    let fg1 = document
        .add_layer(None, "Fg1", solid(1, 1, RED), (0, 0))
        .expect("add Fg1");
    let group = document.add_group(None, "G").expect("add group");
    let fg2 = document
        .add_layer(Some(group), "Fg2", solid(2, 2, RED), (2, 2))
        .expect("add Fg2");
    (document, fg1, fg2)
}

pub fn load_png(path: &Path) -> RgbaImage {
    image::open(path)
        .unwrap_or_else(|e| panic!("failed to open {}: {e}", path.display()))
        .to_rgba8()
}
