use super::*;
use image::{Rgba, RgbaImage};
use std::fs;
use tempfile::TempDir;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// 2x2 opaque square at (1, 1) on a 4x4 transparent layer.
fn square_in_corner() -> RgbaImage {
    let mut pixels = RgbaImage::new(4, 4);
    for x in 1..3 {
        for y in 1..3 {
            pixels.put_pixel(x, y, RED);
        }
    }
    pixels
}

fn write_png(path: &Path, pixels: &RgbaImage) {
    pixels.save(path).unwrap();
}

#[test]
fn test_from_directory_builds_groups_and_layers() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_png(&root.join("b_layer.png"), &solid(3, 2, RED));
    write_png(&root.join("a_layer.png"), &solid(5, 4, BLUE));
    fs::create_dir(root.join("group")).unwrap();
    write_png(&root.join("group").join("inner.png"), &solid(1, 1, RED));
    fs::create_dir(root.join("empty")).unwrap();
    fs::write(root.join("notes.txt"), "not an image").unwrap();
    fs::write(root.join(".hidden.png"), "ignored").unwrap();

    let document = RasterDocument::from_directory(root).unwrap();
    let host = RasterHost::new(document);

    let names: Vec<String> = host
        .top_level_layers()
        .iter()
        .map(|layer| host.name(layer))
        .collect();
    assert_eq!(names, vec!["a_layer", "b_layer", "empty", "group"]);

    let top = host.top_level_layers();
    assert!(!host.is_group(&top[0]));
    assert!(host.is_group(&top[2]));
    assert!(host.children(&top[2]).is_empty());
    let inner = host.children(&top[3]);
    assert_eq!(inner.len(), 1);
    assert_eq!(host.name(&inner[0]), "inner");

    assert_eq!(host.document().width(), 5);
    assert_eq!(host.document().height(), 4);
}

#[test]
fn test_from_directory_rejects_missing_directory() {
    let tmp = TempDir::new().unwrap();
    let result = RasterDocument::from_directory(&tmp.path().join("missing"));
    assert!(result.is_err());
}

#[test]
fn test_add_layer_to_plain_layer_fails() {
    let mut document = RasterDocument::new(2, 2);
    let layer = document.add_layer(None, "pixels", solid(2, 2, RED), (0, 0)).unwrap();
    let result = document.add_layer(Some(layer), "child", solid(1, 1, RED), (0, 0));
    assert!(result.is_err());
}

#[test]
fn test_insert_copy_is_visible_and_counts_images() {
    let mut document = RasterDocument::new(4, 4);
    let hidden = document.add_layer(None, "hidden", solid(4, 4, RED), (0, 0)).unwrap();
    document.set_visible(hidden, false).unwrap();
    let mut host = RasterHost::new(document);
    assert!(!host.is_visible(&hidden));

    let mut canvas = host.create_image().unwrap();
    assert_eq!(host.live_images(), 1);

    let item = host.insert_layer_copy(&mut canvas, &hidden, 0).unwrap();
    assert!(canvas.layer(item).unwrap().visible);
    assert_eq!(canvas.layer_count(), 1);

    host.remove_layer(&mut canvas, item).unwrap();
    assert_eq!(canvas.layer_count(), 0);

    host.delete_image(canvas);
    assert_eq!(host.live_images(), 0);
}

#[test]
fn test_merge_group_flattens_members() {
    let mut document = RasterDocument::new(4, 4);
    let group = document.add_group(None, "group").unwrap();
    document.add_layer(Some(group), "top", solid(1, 1, BLUE), (0, 0)).unwrap();
    document.add_layer(Some(group), "bottom", solid(2, 2, RED), (0, 0)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &group, 0).unwrap();
    assert!(host.is_group_item(&canvas, &item));

    let merged = host.merge_group(&mut canvas, item).unwrap();
    assert!(!host.is_group_item(&canvas, &merged));

    let pixels = canvas.render(merged).unwrap();
    assert_eq!(*pixels.get_pixel(0, 0), BLUE);
    assert_eq!(*pixels.get_pixel(1, 1), RED);
    assert_eq!(pixels.get_pixel(3, 3)[3], 0);
}

#[test]
fn test_autocrop_image_to_layer() {
    let mut document = RasterDocument::new(4, 4);
    let layer = document.add_layer(None, "square", square_in_corner(), (0, 0)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &layer, 0).unwrap();
    host.autocrop_image(&mut canvas, &item).unwrap();

    assert_eq!((canvas.width(), canvas.height()), (2, 2));
    let pixels = canvas.render(item).unwrap();
    assert!(pixels.pixels().all(|pixel| *pixel == RED));
}

#[test]
fn test_autocrop_layer_then_resize_to_image() {
    let mut document = RasterDocument::new(4, 4);
    let layer = document.add_layer(None, "square", square_in_corner(), (0, 0)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &layer, 0).unwrap();
    host.autocrop_layer(&mut canvas, &item).unwrap();
    assert_eq!(canvas.layer(item).unwrap().offset, (1, 1));

    host.resize_layer_to_image(&mut canvas, &item).unwrap();
    let layer = canvas.layer(item).unwrap();
    assert_eq!(layer.offset, (0, 0));
    let (pixels, _) = layer.flatten().unwrap();
    assert_eq!(pixels.dimensions(), (4, 4));
    assert_eq!(*pixels.get_pixel(1, 1), RED);
}

#[test]
fn test_resize_image_to_layers_covers_offsets() {
    let mut document = RasterDocument::new(2, 2);
    let layer = document.add_layer(None, "shifted", solid(3, 3, RED), (-1, 2)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &layer, 0).unwrap();
    host.resize_image_to_layers(&mut canvas).unwrap();

    assert_eq!((canvas.width(), canvas.height()), (3, 3));
    assert_eq!(canvas.layer(item).unwrap().offset, (0, 0));
}

#[test]
fn test_merge_visible_applies_multiply() {
    let mut document = RasterDocument::new(1, 1);
    let top = document
        .add_layer(None, "shade", solid(1, 1, Rgba([128, 128, 128, 255])), (0, 0))
        .unwrap();
    document.set_blend_mode(top, BlendMode::Multiply).unwrap();
    let base = document.add_layer(None, "base", solid(1, 1, Rgba([200, 100, 50, 255])), (0, 0)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    host.insert_layer_copy(&mut canvas, &base, 0).unwrap();
    host.insert_layer_copy(&mut canvas, &top, 0).unwrap();
    let merged = host.merge_visible(&mut canvas).unwrap();

    assert_eq!(canvas.layer_count(), 1);
    let pixels = canvas.render(merged).unwrap();
    assert_eq!(*pixels.get_pixel(0, 0), Rgba([100, 50, 25, 255]));
}

#[test]
fn test_reset_blend_mode_restores_normal() {
    let mut document = RasterDocument::new(1, 1);
    let layer = document.add_layer(None, "shade", solid(1, 1, RED), (0, 0)).unwrap();
    document.set_blend_mode(layer, BlendMode::Multiply).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &layer, 0).unwrap();
    assert_eq!(canvas.layer(item).unwrap().blend, BlendMode::Multiply);
    host.reset_blend_mode(&mut canvas, &item).unwrap();
    assert_eq!(canvas.layer(item).unwrap().blend, BlendMode::Normal);
}

#[test]
fn test_save_png_and_jpeg() {
    let tmp = TempDir::new().unwrap();
    let mut document = RasterDocument::new(3, 2);
    let layer = document.add_layer(None, "layer", solid(3, 2, RED), (0, 0)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &layer, 0).unwrap();

    let png = tmp.path().join("layer.png");
    host.save(&canvas, &item, &png, "layer.png", RunMode::NonInteractive).unwrap();
    let loaded = image::open(&png).unwrap().to_rgba8();
    assert_eq!(loaded.dimensions(), (3, 2));
    assert_eq!(*loaded.get_pixel(0, 0), RED);

    let jpeg = tmp.path().join("layer.JPG");
    host.save(&canvas, &item, &jpeg, "layer.JPG", RunMode::Interactive).unwrap();
    assert!(jpeg.exists());
}

#[test]
fn test_save_unknown_extension_fails_without_cancel() {
    let tmp = TempDir::new().unwrap();
    let mut document = RasterDocument::new(1, 1);
    let layer = document.add_layer(None, "layer", solid(1, 1, RED), (0, 0)).unwrap();
    let mut host = RasterHost::new(document);

    let mut canvas = host.create_image().unwrap();
    let item = host.insert_layer_copy(&mut canvas, &layer, 0).unwrap();
    let path = tmp.path().join("layer.xyz");

    let result = host.save(&canvas, &item, &path, "layer.xyz", RunMode::NonInteractive);
    assert!(matches!(result, Err(SaveFailure::Failed(_))));
    assert!(!path.exists());
}
