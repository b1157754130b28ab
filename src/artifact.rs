//! The configuration artifact model: one manageable file or directory tree.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Privilege needed to write an artifact's destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Direct write with the caller's ambient permissions (home directory).
    #[default]
    User,
    /// Write through the privilege-escalation mechanism (system paths).
    Elevated,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Elevated => write!(f, "elevated"),
        }
    }
}

/// Where an artifact's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A template file containing `{{TOKEN}}` placeholders.
    Template(PathBuf),
    /// An in-memory template.
    Inline(String),
    /// A file copied verbatim.
    File(PathBuf),
    /// A directory tree copied recursively.
    Tree {
        /// Root of the source tree.
        path: PathBuf,
        /// Run the name-based permission classification after the copy.
        secret: bool,
    },
}

impl Source {
    /// Whether the source is rendered through the template renderer.
    #[must_use]
    pub const fn is_template(&self) -> bool {
        matches!(self, Self::Template(_) | Self::Inline(_))
    }

    /// Whether the source is a directory tree.
    #[must_use]
    pub const fn is_tree(&self) -> bool {
        matches!(self, Self::Tree { .. })
    }

    /// On-disk path of the source, if it has one.
    #[must_use]
    pub const fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Template(p) | Self::File(p) | Self::Tree { path: p, .. } => Some(p),
            Self::Inline(_) => None,
        }
    }
}

/// One manageable file or directory.
///
/// Definitions are static: built once from configuration and never mutated
/// during a run.  `destination` is always absolute; the loader rejects
/// anything else.
#[derive(Debug, Clone)]
pub struct ConfigurationArtifact {
    /// Logical name (e.g. `"wsl.conf"`, `"ssh-tree"`).
    pub identity: String,
    /// Template, file, or tree to apply.
    pub source: Source,
    /// Absolute destination path.
    pub destination: PathBuf,
    /// Token name to literal replacement.
    pub placeholders: BTreeMap<String, String>,
    /// Write path to use for the destination.
    pub privilege: Privilege,
    /// Target mode bits for the destination.
    pub mode: u32,
    /// Optional `user[:group]` applied after the mode pass.
    pub owner: Option<String>,
    /// Append missing rendered lines instead of replacing the file.
    pub ensure_lines: bool,
    /// Abort the remaining run when this artifact fails.
    pub required: bool,
    /// Only applicable when running under WSL.
    pub wsl_only: bool,
}

impl ConfigurationArtifact {
    /// Human-readable description used in log lines.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "{} -> {} ({}, {:o})",
            self.identity,
            self.destination.display(),
            self.privilege,
            self.mode
        )
    }
}

/// Default mode for an artifact whose config entry has none.
#[must_use]
pub const fn default_mode(source: &Source) -> u32 {
    match source {
        Source::Tree { secret: true, .. } => 0o700,
        Source::Tree { secret: false, .. } => 0o755,
        _ => 0o644,
    }
}
