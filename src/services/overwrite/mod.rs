//! What to do when an output file already exists.
//!
//! [`resolve`] has no policy of its own: it asks an [`OverwriteChooser`],
//! which is either a fixed batch answer or a prompt.

pub mod prompt;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::services::fs_utils::rename_with_fallback;
use crate::services::naming::uniquify_path;
use crate::types::errors::ExportError;

pub use prompt::PromptChooser;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteMode {
    Replace,
    Skip,
    /// Write the new file under a unique name.
    RenameNew,
    /// Move the existing file to a unique name, then write.
    RenameExisting,
    Cancel,
}

/// Decides what happens to a file that is already on disk.
pub trait OverwriteChooser {
    fn choose(&mut self, file_name: &str) -> OverwriteMode;
}

/// Always answers the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChooser(pub OverwriteMode);

impl OverwriteChooser for FixedChooser {
    fn choose(&mut self, _file_name: &str) -> OverwriteMode {
        self.0
    }
}

impl<C: OverwriteChooser + ?Sized> OverwriteChooser for &mut C {
    fn choose(&mut self, file_name: &str) -> OverwriteMode {
        (**self).choose(file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverwriteResolution {
    pub should_skip: bool,
    pub path: PathBuf,
}

/// Resolve a collision at `path`. Without an existing file the path is
/// returned unchanged and the chooser is not consulted.
pub fn resolve<C>(path: &Path, chooser: &mut C) -> Result<OverwriteResolution, ExportError>
where
    C: OverwriteChooser + ?Sized,
{
    let unchanged = |should_skip| OverwriteResolution {
        should_skip,
        path: path.to_path_buf(),
    };

    if !path.exists() {
        return Ok(unchanged(false));
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    match chooser.choose(&file_name) {
        OverwriteMode::Replace => Ok(unchanged(false)),
        OverwriteMode::Skip => {
            log::debug!("Skipping existing file {}", path.display());
            Ok(unchanged(true))
        }
        OverwriteMode::RenameNew => Ok(OverwriteResolution {
            should_skip: false,
            path: uniquify_path(path),
        }),
        OverwriteMode::RenameExisting => {
            let moved_to = uniquify_path(path);
            rename_with_fallback(path, &moved_to)?;
            log::info!("Renamed existing {} to {}", path.display(), moved_to.display());
            Ok(unchanged(false))
        }
        OverwriteMode::Cancel => Err(ExportError::Cancelled(format!(
            "refused to overwrite '{file_name}'"
        ))),
    }
}

#[cfg(test)]
#[path = "tests/overwrite_tests.rs"]
mod tests;
