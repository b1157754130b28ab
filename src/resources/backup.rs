//! Timestamped pre-overwrite backups.
//!
//! A backup is a sibling named `<original>.<tag>.<timestamp>` holding a full
//! copy of the destination (recursively for directories).  Backups are
//! write-once: an existing backup name is never reused, a numeric suffix is
//! appended instead.
//!
//! When the destination is a symlink that resolves, the backup holds a copy
//! of what the link points at.  Writing through the link afterwards would
//! otherwise leave the backup pointing at the new content.
use std::fmt::{self, Write as _};
use std::io;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};

use crate::artifact::Privilege;
use crate::error::ApplyError;

use super::helpers::fs::path_exists;
use super::writer::PrivilegedWriter;

/// Default chrono format for the backup timestamp (second granularity).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Default tag between the original name and the timestamp.
pub const DEFAULT_BACKUP_TAG: &str = "backup";

/// Source of the wall-clock timestamp embedded in backup names.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current local time formatted with `format`.
    ///
    /// # Errors
    ///
    /// Returns [`fmt::Error`] if `format` holds a specifier chrono cannot
    /// render.
    fn timestamp(&self, format: &str) -> Result<String, fmt::Error>;
}

/// [`Clock`] backed by the system's local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self, format: &str) -> Result<String, fmt::Error> {
        let mut out = String::new();
        write!(out, "{}", chrono::Local::now().format(format))?;
        Ok(out)
    }
}

/// Check that `format` renders to a non-empty single path component.
///
/// # Errors
///
/// Returns a description of the problem: an unsupported specifier, an
/// empty result, or a path separator in the rendered text (`%D` renders
/// one too).
pub fn check_timestamp_format(format: &str) -> Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("unsupported specifier in '{format}'"));
    }
    let sample = SystemClock
        .timestamp(format)
        .map_err(|_| format!("'{format}' cannot be rendered"))?;
    check_name_component(&sample).map_err(|reason| format!("'{format}' {reason}"))
}

/// Check that a backup tag can sit inside a file name.
///
/// # Errors
///
/// Returns a description of the problem when the tag is empty or holds a
/// path separator.
pub fn check_backup_tag(tag: &str) -> Result<(), String> {
    check_name_component(tag).map_err(|reason| format!("'{tag}' {reason}"))
}

fn check_name_component(text: &str) -> Result<(), &'static str> {
    if text.is_empty() {
        return Err("renders empty");
    }
    if text.contains(['/', '\\']) {
        return Err("contains a path separator");
    }
    Ok(())
}

/// Backup policy plus the clock used to name backups.
#[derive(Debug)]
pub struct BackupManager {
    enabled: bool,
    tag: String,
    timestamp_format: String,
    clock: Box<dyn Clock>,
}

impl BackupManager {
    /// Create a manager using the system clock.
    #[must_use]
    pub fn new(enabled: bool, tag: &str, timestamp_format: &str) -> Self {
        Self::with_clock(enabled, tag, timestamp_format, Box::new(SystemClock))
    }

    /// Create a manager with an explicit clock.
    #[must_use]
    pub fn with_clock(
        enabled: bool,
        tag: &str,
        timestamp_format: &str,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            enabled,
            tag: tag.to_string(),
            timestamp_format: timestamp_format.to_string(),
            clock,
        }
    }

    /// Whether backups are taken at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Preserve `path` under a timestamped sibling name.
    ///
    /// Returns `None` without touching the filesystem when `path` does not
    /// exist or the policy disables backups.  Otherwise the copy completes
    /// before this returns, so the caller may overwrite `path` afterwards.
    ///
    /// # Errors
    ///
    /// Any copy failure is reported as [`ApplyError::BackupFailed`].
    pub fn backup(
        &self,
        path: &Path,
        privilege: Privilege,
        writer: &PrivilegedWriter,
    ) -> Result<Option<PathBuf>, ApplyError> {
        if !self.enabled || !path_exists(path) {
            return Ok(None);
        }

        let source = backup_source(path).map_err(|e| e.into_backup_failure(path))?;
        let backup = self
            .next_backup_path(path)
            .map_err(|e| e.into_backup_failure(path))?;
        writer
            .copy(&source, &backup, privilege)
            .map_err(|e| e.into_backup_failure(path))?;
        Ok(Some(backup))
    }

    /// First unused backup name for `path` at the current time.
    fn next_backup_path(&self, path: &Path) -> Result<PathBuf, ApplyError> {
        let stamp = self
            .clock
            .timestamp(&self.timestamp_format)
            .map_err(|_| ApplyError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid backup timestamp format '{}'", self.timestamp_format),
                ),
            })?;
        let base = backup_name(path, &self.tag, &stamp);
        if !path_exists(&base) {
            return Ok(base);
        }
        let free = (1u32..)
            .map(|n| {
                let mut name = base.clone().into_os_string();
                name.push(format!(".{n}"));
                PathBuf::from(name)
            })
            .find(|candidate| !path_exists(candidate));
        Ok(free.unwrap_or(base))
    }
}

/// What a backup of `path` copies: the resolved target when `path` is a
/// symlink, the path itself otherwise.  A dangling link is copied as a link.
fn backup_source(path: &Path) -> Result<PathBuf, ApplyError> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| ApplyError::from_io(path, e))?;
    if !meta.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }
    match dunce::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(e) => Err(ApplyError::from_io(path, e)),
    }
}

/// `<path>.<tag>.<stamp>`.
#[must_use]
pub fn backup_name(path: &Path, tag: &str, stamp: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{tag}.{stamp}"));
    PathBuf::from(name)
}

/// Existing backups of `path` made with `tag`, sorted by name.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be read.
pub fn list_backups(path: &Path, tag: &str) -> io::Result<Vec<PathBuf>> {
    let Some(parent) = path.parent() else {
        return Ok(Vec::new());
    };
    let Some(file_name) = path.file_name() else {
        return Ok(Vec::new());
    };
    let prefix = format!("{}.{tag}.", file_name.to_string_lossy());

    let mut found: Vec<PathBuf> = std::fs::read_dir(parent)?
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect();
    found.sort();
    Ok(found)
}
