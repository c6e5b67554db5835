//! In-memory layered RGBA document.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::services::host::HostError;

/// Image extensions loaded by [`RasterDocument::from_directory`].
const LAYER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterLayerId(pub(crate) u32);

impl fmt::Debug for RasterLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterLayerId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
}

#[derive(Debug, Clone)]
pub struct RasterNode {
    pub name: String,
    pub visible: bool,
    pub blend: BlendMode,
    /// Position of the top-left pixel on the canvas.
    pub offset: (i64, i64),
    /// `None` for groups.
    pub pixels: Option<RgbaImage>,
    /// Topmost first.
    pub children: Vec<RasterLayerId>,
}

impl RasterNode {
    pub fn is_group(&self) -> bool {
        self.pixels.is_none()
    }
}

/// A layered document: a canvas size plus a tree of pixel layers and groups.
#[derive(Debug, Clone)]
pub struct RasterDocument {
    width: u32,
    height: u32,
    nodes: Vec<RasterNode>,
    roots: Vec<RasterLayerId>,
}

impl RasterDocument {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn roots(&self) -> &[RasterLayerId] {
        &self.roots
    }

    pub fn node(&self, id: RasterLayerId) -> Option<&RasterNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Add a pixel layer below the existing children of `parent` (or below the
    /// existing top-level layers).
    pub fn add_layer(
        &mut self,
        parent: Option<RasterLayerId>,
        name: &str,
        pixels: RgbaImage,
        offset: (i64, i64),
    ) -> Result<RasterLayerId, HostError> {
        self.push_node(
            parent,
            RasterNode {
                name: name.to_string(),
                visible: true,
                blend: BlendMode::Normal,
                offset,
                pixels: Some(pixels),
                children: Vec::new(),
            },
        )
    }

    /// Add an empty group below the existing children of `parent`.
    pub fn add_group(&mut self, parent: Option<RasterLayerId>, name: &str) -> Result<RasterLayerId, HostError> {
        self.push_node(
            parent,
            RasterNode {
                name: name.to_string(),
                visible: true,
                blend: BlendMode::Normal,
                offset: (0, 0),
                pixels: None,
                children: Vec::new(),
            },
        )
    }

    pub fn set_visible(&mut self, id: RasterLayerId, visible: bool) -> Result<(), HostError> {
        self.node_mut(id, "set_visible")?.visible = visible;
        Ok(())
    }

    pub fn set_blend_mode(&mut self, id: RasterLayerId, blend: BlendMode) -> Result<(), HostError> {
        self.node_mut(id, "set_blend_mode")?.blend = blend;
        Ok(())
    }

    fn node_mut(&mut self, id: RasterLayerId, operation: &'static str) -> Result<&mut RasterNode, HostError> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| HostError::new(operation, format!("unknown layer {id:?}")))
    }

    fn push_node(&mut self, parent: Option<RasterLayerId>, node: RasterNode) -> Result<RasterLayerId, HostError> {
        let id = RasterLayerId(self.nodes.len() as u32);
        match parent {
            Some(parent_id) => {
                let parent_node = self.node_mut(parent_id, "add_layer")?;
                if !parent_node.is_group() {
                    return Err(HostError::new(
                        "add_layer",
                        format!("'{}' is not a group", parent_node.name),
                    ));
                }
                parent_node.children.push(id);
            }
            None => self.roots.push(id),
        }
        self.nodes.push(node);
        Ok(id)
    }

    /// Build a document from a directory: sub-directories become groups and
    /// image files become layers named after their file stem. Entries are
    /// sorted by name, first entry on top. Hidden entries are skipped.
    ///
    /// The canvas is as large as the largest layer.
    pub fn from_directory(root: &Path) -> Result<Self, HostError> {
        if !root.is_dir() {
            return Err(HostError::new(
                "load_directory",
                format!("not a directory: {}", root.display()),
            ));
        }

        let mut document = Self::new(1, 1);
        let mut groups: HashMap<PathBuf, RasterLayerId> = HashMap::new();
        let (mut width, mut height) = (1u32, 1u32);

        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(|e| HostError::new("load_directory", e.to_string()))?;
            let path = entry.path();
            let parent = path.parent().and_then(|p| groups.get(p)).copied();

            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy().to_string();
                let id = document.add_group(parent, &name)?;
                groups.insert(path.to_path_buf(), id);
                continue;
            }

            if !is_layer_file(path) {
                continue;
            }

            let pixels = match image::open(path) {
                Ok(img) => img.to_rgba8(),
                Err(e) => {
                    log::warn!("Skipping unreadable layer {}: {e}", path.display());
                    continue;
                }
            };
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();

            width = width.max(pixels.width());
            height = height.max(pixels.height());
            document.add_layer(parent, &name, pixels, (0, 0))?;
        }

        document.width = width;
        document.height = height;
        log::debug!(
            "Loaded {} layers from {} ({}x{})",
            document.nodes.len(),
            root.display(),
            width,
            height
        );
        Ok(document)
    }
}

fn is_layer_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| LAYER_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
