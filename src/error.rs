//! Domain-specific error types for the configuration engine.
//!
//! Internal modules return typed errors ([`ApplyError`], [`ConfigError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ApplyError                : caught at the artifact boundary
//! ├── SourceMissing         : skip the artifact, warn
//! ├── BackupFailed          : abort before any destructive write
//! ├── PermissionDenied      : artifact fails, run continues
//! ├── EscalationUnavailable : artifact fails, run continues
//! ├── Render                : reserved for template syntax errors
//! └── Io                    : any other filesystem failure
//!
//! ConfigError               : fatal, raised before the run starts
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while applying a single configuration artifact.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// A template, file, or tree expected as the artifact source is absent.
    #[error("source not found: {}", path.display())]
    SourceMissing {
        /// Path of the missing source.
        path: PathBuf,
    },

    /// The pre-overwrite backup could not be created.
    #[error("backup of {} failed", path.display())]
    BackupFailed {
        /// Destination whose backup failed.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<Self>,
    },

    /// A write, copy, or mode change was refused by the filesystem.
    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        /// Path for which permission was denied.
        path: PathBuf,
    },

    /// The privilege-escalation mechanism could not be used.
    #[error("privilege escalation unavailable: {reason}")]
    EscalationUnavailable {
        /// Why escalation failed (e.g. a password prompt in a non-interactive run).
        reason: String,
    },

    /// The template could not be rendered.
    ///
    /// The current `{{TOKEN}}` format cannot fail, so nothing produces this
    /// variant yet.
    #[error("template render failed: {reason}")]
    Render {
        /// Human-readable explanation.
        reason: String,
    },

    /// Any other I/O failure.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl ApplyError {
    /// Map an [`io::Error`] raised for `path` into the matching variant.
    ///
    /// `PermissionDenied` keeps its own variant so callers can tell it
    /// apart from generic I/O failures.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Wrap `self` as the cause of a failed backup of `path`.
    #[must_use]
    pub fn into_backup_failure(self, path: &Path) -> Self {
        Self::BackupFailed {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("invalid TOML in {}: {message}", path.display())]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// An artifact definition is structurally wrong.
    #[error("artifact '{identity}': {reason}")]
    InvalidArtifact {
        /// Logical artifact name.
        identity: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An artifact destination is not absolute after `~` expansion.
    #[error("artifact '{identity}': destination must be absolute, got {path}")]
    RelativeDestination {
        /// Logical artifact name.
        identity: String,
        /// Destination as written in the config.
        path: String,
    },

    /// A `[policy]` value cannot be used.
    #[error("policy.{field}: {reason}")]
    InvalidPolicy {
        /// Key inside `[policy]`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An artifact mode is not a valid octal permission string.
    #[error("artifact '{identity}': invalid octal mode '{mode}'")]
    InvalidMode {
        /// Logical artifact name.
        identity: String,
        /// Mode as written in the config.
        mode: String,
    },
}
