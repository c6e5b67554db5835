//! Collision-free naming for exported files and directories.
//!
//! - [`uniquify_name`] appends ` (n)` (n starting at 2) until the caller's
//!   existence check reports the name as free.
//! - [`uniquify_path`] does the same against the file system.
//! - Square-bracket helpers used by the bracket modes of the exporter.

use std::path::{Path, PathBuf};

/// Where the numeric suffix goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixPlacement {
    /// `name (2)`
    End,
    /// `name (2).png`; falls back to [`SuffixPlacement::End`] when the name has
    /// no extension.
    BeforeExtension,
}

/// Return `candidate` unchanged if `exists(candidate)` is false, otherwise the
/// first `candidate (n)` (n = 2, 3, ...) that does not exist.
pub fn uniquify_name<F>(candidate: &str, placement: SuffixPlacement, mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    if !exists(candidate) {
        return candidate.to_string();
    }

    let (stem, ext) = match placement {
        SuffixPlacement::End => (candidate, ""),
        SuffixPlacement::BeforeExtension => match extension_index(candidate) {
            Some(index) => candidate.split_at(index),
            None => (candidate, ""),
        },
    };

    let mut n = 2u32;
    loop {
        let suffixed = format!("{stem} ({n}){ext}");
        if !exists(&suffixed) {
            return suffixed;
        }
        n += 1;
    }
}

/// Uniquify a file path against the file system, placing the suffix before the
/// file extension.
pub fn uniquify_path(path: &Path) -> PathBuf {
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
        return path.to_path_buf();
    };
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let unique = uniquify_name(&file_name, SuffixPlacement::BeforeExtension, |name| {
        parent.join(name).exists()
    });
    parent.join(unique)
}

/// Byte index of the `.` that starts the extension, if any.
///
/// A leading dot (`.hidden`) and a trailing dot (`name.`) do not start an
/// extension.
pub(crate) fn extension_index(name: &str) -> Option<usize> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(index) if index + 1 == name.len() => None,
        Some(index) => Some(index),
    }
}

/// Lowercased extension of `name` without the dot, or an empty string.
pub fn file_extension(name: &str) -> String {
    extension_index(name)
        .map(|index| name[index + 1..].to_lowercase())
        .unwrap_or_default()
}

/// Replace, add (`Some`) or strip (`None`) the extension of `name`.
pub fn with_file_extension(name: &str, extension: Option<&str>) -> String {
    let stem = match extension_index(name) {
        Some(index) => &name[..index],
        None => name,
    };
    match extension {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem.to_string(),
    }
}

pub fn is_enclosed_in_square_brackets(name: &str) -> bool {
    name.starts_with('[') && name.ends_with(']')
}

/// Drop a leading `[` and a trailing `]`, each independently.
pub fn strip_square_brackets(name: &str) -> String {
    let name = name.strip_prefix('[').unwrap_or(name);
    let name = name.strip_suffix(']').unwrap_or(name);
    name.to_string()
}

pub fn add_square_brackets(name: &str) -> String {
    format!("[{name}]")
}

#[cfg(test)]
#[path = "tests/naming_tests.rs"]
mod tests;
