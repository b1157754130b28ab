//! `[[artifacts]]` entries and their conversion into [`ConfigurationArtifact`]s.
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::artifact::{ConfigurationArtifact, Privilege, Source, default_mode};
use crate::error::ConfigError;

use super::Environment;

/// Minimum length for octal mode strings.
const OCTAL_MODE_MIN_LEN: usize = 3;

/// Maximum length for octal mode strings.
const OCTAL_MODE_MAX_LEN: usize = 4;

/// One `[[artifacts]]` table as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactEntry {
    /// Logical name.
    pub identity: String,
    /// Template file, relative to the root.
    #[serde(default)]
    pub template: Option<PathBuf>,
    /// Inline template content.
    #[serde(default)]
    pub content: Option<String>,
    /// File copied verbatim, relative to the root.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Directory copied recursively, relative to the root.
    #[serde(default)]
    pub tree: Option<PathBuf>,
    /// Destination; `~/` expands to the home directory.
    pub destination: String,
    /// Token values for this artifact only; they override the globals.
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
    /// `user` or `elevated`.
    #[serde(default)]
    pub privilege: Privilege,
    /// Octal mode string such as `"644"` or `"0600"`.
    #[serde(default)]
    pub mode: Option<String>,
    /// `user[:group]`.
    #[serde(default)]
    pub owner: Option<String>,
    /// Run the name-based mode pass over a copied tree.
    #[serde(default)]
    pub secret: bool,
    /// Append missing lines instead of replacing the file.
    #[serde(default)]
    pub ensure_lines: bool,
    /// Abort the remaining artifacts when this one fails.
    #[serde(default)]
    pub required: bool,
    /// Skip outside WSL.
    #[serde(default)]
    pub wsl_only: bool,
}

impl ArtifactEntry {
    /// Resolve this entry against the repository root and environment.
    ///
    /// `globals` already holds the built-in and `[placeholders]` values;
    /// per-artifact placeholders override them.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the entry does not name exactly one
    /// source, combines options that do not fit its source, has a bad mode,
    /// or has a destination that is not absolute after `~` expansion.
    pub fn resolve(
        self,
        root: &Path,
        env: &Environment,
        globals: &BTreeMap<String, String>,
    ) -> Result<ConfigurationArtifact, ConfigError> {
        let identity = self.identity;
        if identity.trim().is_empty() {
            return Err(ConfigError::InvalidArtifact {
                identity,
                reason: "identity must not be empty".to_string(),
            });
        }

        let invalid = |reason: &str| ConfigError::InvalidArtifact {
            identity: identity.clone(),
            reason: reason.to_string(),
        };

        let source = match (self.template, self.content, self.file, self.tree) {
            (Some(path), None, None, None) => Source::Template(root.join(path)),
            (None, Some(text), None, None) => Source::Inline(text),
            (None, None, Some(path), None) => Source::File(root.join(path)),
            (None, None, None, Some(path)) => Source::Tree {
                path: root.join(path),
                secret: self.secret,
            },
            _ => {
                return Err(invalid(
                    "exactly one of template, content, file, or tree is required",
                ));
            }
        };

        if self.secret && !source.is_tree() {
            return Err(invalid("secret is only valid for tree artifacts"));
        }
        if self.ensure_lines && source.is_tree() {
            return Err(invalid("ensure_lines is not valid for tree artifacts"));
        }

        let destination = expand_home(&self.destination, &env.home);
        if !destination.is_absolute() {
            return Err(ConfigError::RelativeDestination {
                identity,
                path: self.destination,
            });
        }

        let mode = match self.mode {
            Some(text) => parse_mode(&text).ok_or_else(|| ConfigError::InvalidMode {
                identity: identity.clone(),
                mode: text,
            })?,
            None => default_mode(&source),
        };

        let mut placeholders = globals.clone();
        placeholders.extend(self.placeholders);

        Ok(ConfigurationArtifact {
            identity,
            source,
            destination,
            placeholders,
            privilege: self.privilege,
            mode,
            owner: self.owner,
            ensure_lines: self.ensure_lines,
            required: self.required,
            wsl_only: self.wsl_only,
        })
    }
}

/// Expand a leading `~` or `~/` to `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    raw.strip_prefix("~/")
        .map_or_else(|| PathBuf::from(raw), |rest| home.join(rest))
}

/// Parse an octal mode string (`"644"`, `"0755"`).
#[must_use]
pub fn parse_mode(text: &str) -> Option<u32> {
    if text.len() < OCTAL_MODE_MIN_LEN || text.len() > OCTAL_MODE_MAX_LEN {
        return None;
    }
    if !text.chars().all(|c| ('0'..='7').contains(&c)) {
        return None;
    }
    u32::from_str_radix(text, 8).ok()
}
