//! File-system resource helpers.
//!
//! Every helper reports failures as [`ApplyError`] so that a permission
//! problem stays distinguishable from other I/O errors all the way up to the
//! artifact boundary.
use std::fs;
use std::io::Write as _;
use std::path::Path;

use crate::error::ApplyError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), ApplyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ApplyError::from_io(parent, e))?;
    }
    Ok(())
}

/// Write `content` to `path` so that readers observe either the previous
/// content or the complete new content, never a prefix.
///
/// The bytes go to a temporary sibling which is flushed and then renamed
/// over `path`.  A failure at any step removes the temporary file and leaves
/// `path` untouched.
///
/// # Errors
///
/// Returns an error if the parent cannot be created, the temporary file
/// cannot be written, or the final rename fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ApplyError> {
    ensure_parent_dir(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(".wsl-setup.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ApplyError::from_io(path, e))?;
    tmp.write_all(content)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ApplyError::from_io(path, e))?;
    tmp.persist(path)
        .map_err(|e| ApplyError::from_io(path, e.error))?;
    Ok(())
}

/// Recursively copy a directory tree, merging into `dst`.
///
/// Existing files under `dst` with the same relative path are overwritten;
/// files present only in `dst` are kept.  Symlinks are recreated as
/// symlinks (on Unix) rather than followed, so a copy preserves the file
/// type of every entry.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), ApplyError> {
    fs::create_dir_all(dst).map_err(|e| ApplyError::from_io(dst, e))?;
    let entries = fs::read_dir(src).map_err(|e| ApplyError::from_io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ApplyError::from_io(src, e))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| ApplyError::from_io(&src_path, e))?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).map_err(|e| ApplyError::from_io(&dst_path, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), ApplyError> {
    let target = fs::read_link(src).map_err(|e| ApplyError::from_io(src, e))?;
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst).map_err(|e| ApplyError::from_io(dst, e))?;
    }
    std::os::unix::fs::symlink(&target, dst).map_err(|e| ApplyError::from_io(dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), ApplyError> {
    if src.is_dir() {
        copy_tree(src, dst)
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| ApplyError::from_io(dst, e))
    }
}

/// Copy a file or a directory tree from `src` to `dst`.
///
/// # Errors
///
/// Returns an error if `src` cannot be inspected or the copy fails.
pub fn copy_path(src: &Path, dst: &Path) -> Result<(), ApplyError> {
    let meta = fs::symlink_metadata(src).map_err(|e| ApplyError::from_io(src, e))?;
    if meta.file_type().is_symlink() {
        copy_symlink(src, dst)
    } else if meta.is_dir() {
        copy_tree(src, dst)
    } else {
        ensure_parent_dir(dst)?;
        fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| ApplyError::from_io(dst, e))
    }
}

/// Set the permission bits of `path` (Unix only; a no-op elsewhere).
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<(), ApplyError> {
    use std::os::unix::fs::PermissionsExt as _;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| ApplyError::from_io(path, e))
}

/// Set the permission bits of `path` (Unix only; a no-op elsewhere).
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub const fn set_mode(_path: &Path, _mode: u32) -> Result<(), ApplyError> {
    Ok(())
}

/// Whether anything (including a broken symlink) exists at `path`.
#[must_use]
pub fn path_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
