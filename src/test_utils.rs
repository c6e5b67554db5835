//! Scripted in-memory host for unit tests.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use crate::services::host::{HostError, ImageHost, LayerSource, RunMode, SaveFailure};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

#[derive(Debug, Clone)]
struct FakeLayer {
    name: String,
    visible: bool,
    /// `Some` for groups.
    children: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCall {
    pub path: PathBuf,
    pub base_name: String,
    pub run_mode: RunMode,
}

#[derive(Debug, Clone)]
struct FakeItem {
    id: u32,
    label: String,
    group: bool,
}

#[derive(Debug)]
pub struct FakeImage {
    items: Vec<FakeItem>,
}

impl FakeImage {
    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(|item| item.label.clone()).collect()
    }
}

/// Host double: layers are names and flags, images are lists of labelled
/// items, and every primitive call is appended to [`FakeHost::calls`].
///
/// Successful saves write an empty file at the target path.
#[derive(Debug, Default)]
pub struct FakeHost {
    layers: Vec<FakeLayer>,
    roots: Vec<usize>,
    next_item: u32,
    live_images: usize,
    pub calls: Vec<String>,
    pub saves: Vec<SaveCall>,
    /// Items still inside each image when it was deleted.
    pub leftover_items: Vec<usize>,
    queued_failures: VecDeque<SaveFailure>,
    failing_extensions: HashMap<String, SaveFailure>,
    failing_names: HashMap<String, SaveFailure>,
    fail_create_image: bool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, parent: Option<usize>, name: &str) -> usize {
        self.push(parent, name, None)
    }

    pub fn add_group(&mut self, parent: Option<usize>, name: &str) -> usize {
        self.push(parent, name, Some(Vec::new()))
    }

    pub fn set_visible(&mut self, layer: usize, visible: bool) {
        self.layers[layer].visible = visible;
    }

    /// The next saves fail with these outcomes, in order.
    pub fn queue_save_failures(&mut self, failures: impl IntoIterator<Item = SaveFailure>) {
        self.queued_failures.extend(failures);
    }

    /// Every save to a file with this extension fails.
    pub fn fail_extension(&mut self, extension: &str, failure: SaveFailure) {
        self.failing_extensions.insert(extension.to_string(), failure);
    }

    /// Every save to a file with this base name fails.
    pub fn fail_file_name(&mut self, base_name: &str, failure: SaveFailure) {
        self.failing_names.insert(base_name.to_string(), failure);
    }

    pub fn fail_create_image(&mut self) {
        self.fail_create_image = true;
    }

    pub fn live_images(&self) -> usize {
        self.live_images
    }

    pub fn saved_names(&self) -> Vec<String> {
        self.saves.iter().map(|save| save.base_name.clone()).collect()
    }

    fn push(&mut self, parent: Option<usize>, name: &str, children: Option<Vec<usize>>) -> usize {
        let id = self.layers.len();
        self.layers.push(FakeLayer {
            name: name.to_string(),
            visible: true,
            children,
        });
        match parent {
            Some(parent) => self.layers[parent]
                .children
                .as_mut()
                .expect("parent must be a group")
                .push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn new_item(&mut self, label: &str, group: bool) -> FakeItem {
        self.next_item += 1;
        FakeItem {
            id: self.next_item,
            label: label.to_string(),
            group,
        }
    }

    fn item_label(image: &FakeImage, item: u32) -> Result<String, HostError> {
        image
            .items
            .iter()
            .find(|existing| existing.id == item)
            .map(|existing| existing.label.clone())
            .ok_or_else(|| HostError::new("lookup", format!("no item {item}")))
    }
}

impl LayerSource for FakeHost {
    type Handle = usize;

    fn top_level_layers(&self) -> Vec<usize> {
        self.roots.clone()
    }

    fn children(&self, layer: &usize) -> Vec<usize> {
        self.layers[*layer].children.clone().unwrap_or_default()
    }

    fn is_group(&self, layer: &usize) -> bool {
        self.layers[*layer].children.is_some()
    }

    fn is_visible(&self, layer: &usize) -> bool {
        self.layers[*layer].visible
    }

    fn name(&self, layer: &usize) -> String {
        self.layers[*layer].name.clone()
    }
}

impl ImageHost for FakeHost {
    type Image = FakeImage;
    type Item = u32;

    fn create_image(&mut self) -> Result<FakeImage, HostError> {
        if self.fail_create_image {
            return Err(HostError::new("create_image", "out of memory"));
        }
        self.live_images += 1;
        self.calls.push("create_image".into());
        Ok(FakeImage { items: Vec::new() })
    }

    fn delete_image(&mut self, image: FakeImage) {
        self.live_images -= 1;
        self.leftover_items.push(image.items.len());
        self.calls.push("delete_image".into());
    }

    fn insert_layer_copy(
        &mut self,
        image: &mut FakeImage,
        layer: &usize,
        position: usize,
    ) -> Result<u32, HostError> {
        let name = self.name(layer);
        let group = self.is_group(layer);
        let item = self.new_item(&name, group);
        let id = item.id;
        image.items.insert(position.min(image.items.len()), item);
        self.calls.push(format!("insert {name}@{position}"));
        Ok(id)
    }

    fn is_group_item(&self, image: &FakeImage, item: &u32) -> bool {
        image.items.iter().any(|existing| existing.id == *item && existing.group)
    }

    fn merge_group(&mut self, image: &mut FakeImage, item: u32) -> Result<u32, HostError> {
        let label = Self::item_label(image, item)?;
        let merged = self.new_item(&label, false);
        let id = merged.id;
        if let Some(slot) = image.items.iter_mut().find(|existing| existing.id == item) {
            *slot = merged;
        }
        self.calls.push(format!("merge_group {label}"));
        Ok(id)
    }

    fn merge_visible(&mut self, image: &mut FakeImage) -> Result<u32, HostError> {
        let merged = self.new_item("merged", false);
        let id = merged.id;
        image.items = vec![merged];
        self.calls.push("merge_visible".into());
        Ok(id)
    }

    fn reset_blend_mode(&mut self, image: &mut FakeImage, item: &u32) -> Result<(), HostError> {
        let label = Self::item_label(image, *item)?;
        self.calls.push(format!("reset_blend_mode {label}"));
        Ok(())
    }

    fn resize_image_to_layers(&mut self, _image: &mut FakeImage) -> Result<(), HostError> {
        self.calls.push("resize_image_to_layers".into());
        Ok(())
    }

    fn autocrop_image(&mut self, image: &mut FakeImage, item: &u32) -> Result<(), HostError> {
        let label = Self::item_label(image, *item)?;
        self.calls.push(format!("autocrop_image {label}"));
        Ok(())
    }

    fn autocrop_layer(&mut self, image: &mut FakeImage, item: &u32) -> Result<(), HostError> {
        let label = Self::item_label(image, *item)?;
        self.calls.push(format!("autocrop_layer {label}"));
        Ok(())
    }

    fn resize_layer_to_image(&mut self, image: &mut FakeImage, item: &u32) -> Result<(), HostError> {
        let label = Self::item_label(image, *item)?;
        self.calls.push(format!("resize_layer_to_image {label}"));
        Ok(())
    }

    fn remove_layer(&mut self, image: &mut FakeImage, item: u32) -> Result<(), HostError> {
        let label = Self::item_label(image, item)?;
        image.items.retain(|existing| existing.id != item);
        self.calls.push(format!("remove {label}"));
        Ok(())
    }

    fn save(
        &mut self,
        _image: &FakeImage,
        _item: &u32,
        path: &Path,
        base_name: &str,
        run_mode: RunMode,
    ) -> Result<(), SaveFailure> {
        self.saves.push(SaveCall {
            path: path.to_path_buf(),
            base_name: base_name.to_string(),
            run_mode,
        });

        if let Some(failure) = self.queued_failures.pop_front() {
            return Err(failure);
        }
        if let Some(failure) = self.failing_names.get(base_name) {
            return Err(failure.clone());
        }
        let extension = crate::services::naming::file_extension(base_name);
        if let Some(failure) = self.failing_extensions.get(&extension) {
            return Err(failure.clone());
        }

        fs::write(path, b"").map_err(|e| SaveFailure::Failed(e.to_string()))
    }
}
