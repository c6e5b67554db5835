use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::overwrite::OverwriteMode;

/// How layers whose names are enclosed in square brackets are treated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BracketMode {
    /// Strip the brackets and export like any other layer.
    #[default]
    Normal,
    /// Bracketed layers are composited beneath every exported layer.
    Background,
    Ignore,
    /// Export only the bracketed layers.
    IgnoreOther,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionMatchMode {
    /// Every layer gets the default extension appended.
    #[default]
    ExportAll,
    /// Export only layers whose name already ends in the default extension.
    OnlyMatchingExtension,
    /// A layer's own extension picks the encoder.
    UseAsFileExtension,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStripMode {
    #[default]
    Never,
    IdenticalToDefault,
    Always,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    pub output_directory: PathBuf,
    pub file_extension: String,
    pub layer_groups_as_directories: bool,
    pub merge_layer_groups: bool,
    pub ignore_invisible: bool,
    pub empty_directories: bool,
    pub square_bracketed_mode: BracketMode,
    pub file_extension_mode: ExtensionMatchMode,
    pub strip_mode: ExtensionStripMode,
    pub crop_to_background: bool,
    pub autocrop: bool,
    pub use_image_size: bool,
    pub ignore_layer_modes: bool,
    /// Batch answer used when no one is asked about existing files.
    pub overwrite_mode: OverwriteMode,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            file_extension: "png".into(),
            layer_groups_as_directories: false,
            merge_layer_groups: false,
            ignore_invisible: false,
            empty_directories: false,
            square_bracketed_mode: BracketMode::Normal,
            file_extension_mode: ExtensionMatchMode::ExportAll,
            strip_mode: ExtensionStripMode::Never,
            crop_to_background: false,
            autocrop: false,
            use_image_size: false,
            ignore_layer_modes: false,
            overwrite_mode: OverwriteMode::Skip,
        }
    }
}
