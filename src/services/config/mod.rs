//! Export settings and their JSON loading.

pub mod models;

pub use models::*;

use std::fs;
use std::io;
use std::path::Path;

use crate::types::errors::ExportError;

impl ExportSettings {
    /// Default extension without leading dots, lowercased.
    pub fn normalized_extension(&self) -> String {
        self.file_extension.trim().trim_start_matches('.').to_lowercase()
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.output_directory.as_os_str().is_empty() {
            return Err(ExportError::InvalidSettings(
                "output directory is empty".to_string(),
            ));
        }

        let extension = self.normalized_extension();
        if extension.is_empty() {
            return Err(ExportError::InvalidSettings(
                "file extension is empty".to_string(),
            ));
        }
        if sanitize_filename::sanitize(&extension) != extension || extension.contains('.') {
            return Err(ExportError::InvalidSettings(format!(
                "file extension '{}' is not valid",
                self.file_extension
            )));
        }
        Ok(())
    }
}

/// Read settings from a JSON file. Missing keys take their defaults; a missing
/// file yields the default settings.
pub fn load_settings(path: &Path) -> Result<ExportSettings, ExportError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No settings file at {}, using defaults", path.display());
            return Ok(ExportSettings::default());
        }
        Err(e) => {
            return Err(ExportError::InvalidSettings(format!(
                "cannot read {}: {e}",
                path.display()
            )))
        }
    };

    let settings: ExportSettings = serde_json::from_str(&content).map_err(|e| {
        ExportError::InvalidSettings(format!("malformed {}: {e}", path.display()))
    })?;
    log::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
