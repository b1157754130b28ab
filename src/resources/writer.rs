//! Privilege-scoped filesystem writes.
//!
//! [`PrivilegedWriter`] is the only component that mutates artifact
//! destinations.  User-scoped operations run directly with the caller's
//! ambient rights; elevated operations are delegated to an injected
//! [`ElevatedWriter`] capability so tests can substitute a fake that always
//! succeeds or always denies.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifact::Privilege;
use crate::error::ApplyError;
use crate::exec::{ExecResult, Executor};

use super::helpers::fs as fs_helpers;

/// Capability for filesystem operations that need more than ambient rights.
///
/// Every `write` must be all-or-nothing: either the full content lands at
/// the destination or the destination is left untouched.
pub trait ElevatedWriter: Send + Sync + fmt::Debug {
    /// Replace `path` with `content`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::PermissionDenied`],
    /// [`ApplyError::EscalationUnavailable`], or [`ApplyError::Io`].
    fn write(&self, path: &Path, content: &[u8]) -> Result<(), ApplyError>;

    /// Copy a file or directory tree from `src` to `dst`, preserving file
    /// types and merging into an existing directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy cannot be performed.
    fn copy(&self, src: &Path, dst: &Path) -> Result<(), ApplyError>;

    /// Set the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode cannot be changed.
    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), ApplyError>;

    /// Change the owner of `path` (recursively when `recursive`).
    ///
    /// # Errors
    ///
    /// Returns an error if ownership cannot be changed.
    fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), ApplyError>;
}

/// Run a privileged command and translate failure into an [`ApplyError`].
fn run_privileged(
    executor: &dyn Executor,
    program: &str,
    args: &[&str],
    path: &Path,
) -> Result<(), ApplyError> {
    let result = executor
        .run_unchecked(program, args)
        .map_err(|e| ApplyError::EscalationUnavailable {
            reason: format!("{e:#}"),
        })?;
    if result.success {
        Ok(())
    } else {
        Err(classify_failure(&result, path))
    }
}

/// Map a failed privileged command to the matching error kind by its stderr.
fn classify_failure(result: &ExecResult, path: &Path) -> ApplyError {
    let stderr = result.stderr.trim();
    let lower = stderr.to_lowercase();
    if lower.contains("password is required")
        || lower.contains("terminal is required")
        || lower.contains("no tty present")
        || lower.contains("is not in the sudoers file")
        || lower.contains("not allowed to execute")
    {
        ApplyError::EscalationUnavailable {
            reason: stderr.to_string(),
        }
    } else if lower.contains("permission denied") || lower.contains("operation not permitted") {
        ApplyError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        ApplyError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(format!(
                "exit {}: {stderr}",
                result.code.unwrap_or(-1)
            )),
        }
    }
}

/// Arguments for `chown`, with `-R` when `recursive`.
fn chown_args<'a>(owner: &'a str, target: &'a str, recursive: bool) -> Vec<&'a str> {
    let mut args = Vec::with_capacity(3);
    if recursive {
        args.push("-R");
    }
    args.push(owner);
    args.push(target);
    args
}

/// Elevated writer that uses ambient rights.
///
/// Used when the process already runs as root, or when the configuration
/// sets `elevation = "none"`.  Ownership changes still shell out to `chown`
/// because resolving user names needs the system account database.
#[derive(Debug, Clone)]
pub struct DirectElevator {
    executor: Arc<dyn Executor>,
}

impl DirectElevator {
    /// Create a direct elevator.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

impl ElevatedWriter for DirectElevator {
    fn write(&self, path: &Path, content: &[u8]) -> Result<(), ApplyError> {
        fs_helpers::write_atomic(path, content)
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<(), ApplyError> {
        fs_helpers::copy_path(src, dst)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), ApplyError> {
        fs_helpers::set_mode(path, mode)
    }

    fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), ApplyError> {
        let target = path.to_string_lossy();
        run_privileged(
            self.executor.as_ref(),
            "chown",
            &chown_args(owner, &target, recursive),
            path,
        )
    }
}

/// Elevated writer that runs non-interactive `sudo -n`.
///
/// A password prompt cannot be answered in this mode, so it surfaces as
/// [`ApplyError::EscalationUnavailable`] instead of blocking the run.
///
/// File writes are staged in a user-owned temporary file, copied next to the
/// destination under a temporary name, and renamed over it with `mv -f`;
/// the rename is the only step visible at the destination.
#[derive(Debug, Clone)]
pub struct SudoElevator {
    executor: Arc<dyn Executor>,
}

impl SudoElevator {
    /// Create a sudo-backed elevator.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    fn sudo(&self, args: &[&str], path: &Path) -> Result<(), ApplyError> {
        if !self.executor.which("sudo") {
            return Err(ApplyError::EscalationUnavailable {
                reason: "sudo is not installed".to_string(),
            });
        }
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("-n");
        full.extend_from_slice(args);
        run_privileged(self.executor.as_ref(), "sudo", &full, path)
    }

    fn mkdir_parent(&self, path: &Path) -> Result<(), ApplyError> {
        if let Some(parent) = path.parent() {
            let parent_str = parent.to_string_lossy();
            self.sudo(&["mkdir", "-p", &parent_str], parent)?;
        }
        Ok(())
    }
}

/// Temporary sibling used for the final rename of an elevated write.
fn staging_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "artifact".into(), |n| n.to_string_lossy());
    path.with_file_name(format!(".{name}.wsl-setup.tmp"))
}

impl ElevatedWriter for SudoElevator {
    fn write(&self, path: &Path, content: &[u8]) -> Result<(), ApplyError> {
        let staged = tempfile::NamedTempFile::new()
            .map_err(|e| ApplyError::from_io(&std::env::temp_dir(), e))?;
        std::fs::write(staged.path(), content)
            .map_err(|e| ApplyError::from_io(staged.path(), e))?;

        self.mkdir_parent(path)?;
        let sibling = staging_sibling(path);
        let staged_str = staged.path().to_string_lossy();
        let sibling_str = sibling.to_string_lossy();
        let path_str = path.to_string_lossy();

        self.sudo(&["cp", &staged_str, &sibling_str], path)?;
        if let Err(e) = self.sudo(&["mv", "-f", &sibling_str, &path_str], path) {
            // Best effort: the destination is untouched, only the sibling remains.
            let _ = self.sudo(&["rm", "-f", &sibling_str], &sibling);
            return Err(e);
        }
        Ok(())
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<(), ApplyError> {
        let src_str = src.to_string_lossy();
        let dst_str = dst.to_string_lossy();
        if src.is_dir() {
            self.sudo(&["mkdir", "-p", &dst_str], dst)?;
            let contents = format!("{}/.", src_str.trim_end_matches('/'));
            self.sudo(&["cp", "-a", &contents, &dst_str], dst)
        } else {
            self.mkdir_parent(dst)?;
            self.sudo(&["cp", "-a", &src_str, &dst_str], dst)
        }
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), ApplyError> {
        let mode_str = format!("{mode:o}");
        let path_str = path.to_string_lossy();
        self.sudo(&["chmod", &mode_str, &path_str], path)
    }

    fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), ApplyError> {
        let target = path.to_string_lossy();
        let mut args = vec!["chown"];
        args.extend(chown_args(owner, &target, recursive));
        self.sudo(&args, path)
    }
}

/// Routes every destination mutation through the path matching the
/// artifact's [`Privilege`].
#[derive(Debug, Clone)]
pub struct PrivilegedWriter {
    elevated: Arc<dyn ElevatedWriter>,
}

impl PrivilegedWriter {
    /// Create a writer with the given elevation capability.
    #[must_use]
    pub fn new(elevated: Arc<dyn ElevatedWriter>) -> Self {
        Self { elevated }
    }

    /// Replace `path` with `content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the destination is unchanged.
    pub fn write(&self, path: &Path, content: &[u8], privilege: Privilege) -> Result<(), ApplyError> {
        match privilege {
            Privilege::User => fs_helpers::write_atomic(path, content),
            Privilege::Elevated => self.elevated.write(path, content),
        }
    }

    /// Copy a file or tree from `src` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub fn copy(&self, src: &Path, dst: &Path, privilege: Privilege) -> Result<(), ApplyError> {
        match privilege {
            Privilege::User => fs_helpers::copy_path(src, dst),
            Privilege::Elevated => self.elevated.copy(src, dst),
        }
    }

    /// Set the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mode cannot be changed.
    pub fn set_mode(&self, path: &Path, mode: u32, privilege: Privilege) -> Result<(), ApplyError> {
        match privilege {
            Privilege::User => fs_helpers::set_mode(path, mode),
            Privilege::Elevated => self.elevated.set_mode(path, mode),
        }
    }

    /// Change ownership of `path`.
    ///
    /// Ownership changes always need elevation, whatever the artifact's
    /// privilege.
    ///
    /// # Errors
    ///
    /// Returns an error if ownership cannot be changed.
    pub fn chown(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), ApplyError> {
        self.elevated.chown(path, owner, recursive)
    }
}
