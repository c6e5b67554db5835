use std::fs;
use std::io;
use std::path::Path;

/// Create `path` and any missing parents. An existing directory is fine; an
/// existing file at `path` is an error.
pub fn make_dirs(path: &Path) -> io::Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Move the file at `from` to `to`. When a plain rename is refused (for
/// example across file systems) the file is copied and the source removed.
/// An existing file at `to` is never replaced by the copy.
pub fn rename_with_fallback(from: &Path, to: &Path) -> io::Result<()> {
    let rename_error = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if !from.is_file() || to.exists() {
        return Err(rename_error);
    }

    log::debug!(
        "Moving {} to {} by copy after rename failed: {rename_error}",
        from.display(),
        to.display()
    );
    fs_extra::file::move_file(from, to, &fs_extra::file::CopyOptions::new())
        .map(drop)
        .map_err(|e| io::Error::other(format!("cannot move {}: {e}", from.display())))
}
