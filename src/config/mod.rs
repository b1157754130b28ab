//! Configuration loading: policy, placeholders, and artifact definitions.
//!
//! Everything is read once from `<root>/conf/wsl-setup.toml` into a
//! [`Config`] that is passed by reference to the engine.
pub mod artifacts;
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::artifact::ConfigurationArtifact;
use crate::error::ConfigError;
use crate::resources::backup::{
    DEFAULT_BACKUP_TAG, DEFAULT_TIMESTAMP_FORMAT, check_backup_tag, check_timestamp_format,
};

/// Location of the config file relative to the root.
pub const CONFIG_FILE: &str = "conf/wsl-setup.toml";

/// How elevated writes are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Elevation {
    /// Non-interactive `sudo -n`.
    #[default]
    Sudo,
    /// Ambient rights; for runs that are already root.
    None,
}

/// Global apply policy (`[policy]`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Back up existing destinations before overwriting them.
    pub backups_enabled: bool,
    /// chrono format for the backup timestamp.
    pub timestamp_format: String,
    /// Word between the original name and the timestamp.
    pub backup_tag: String,
    /// How elevated artifacts are written.
    pub elevation: Elevation,
    /// Run log location; defaults to the cache directory.
    pub log_file: Option<PathBuf>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            backups_enabled: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            backup_tag: DEFAULT_BACKUP_TAG.to_string(),
            elevation: Elevation::default(),
            log_file: None,
        }
    }
}

/// Values taken from the process environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Home directory used for `~` expansion and the `HOME` placeholder.
    pub home: PathBuf,
    /// Login name used for the `USER` placeholder.
    pub user: String,
}

impl Environment {
    /// Read `HOME` and `USER` (falling back to `LOGNAME`).
    ///
    /// An unset `HOME` leaves `home` empty, so `~/` destinations fail the
    /// absolute-path check instead of landing somewhere unexpected.
    #[must_use]
    pub fn from_env() -> Self {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_default();
        Self { home, user }
    }

    /// Placeholders every artifact gets without declaring them.
    #[must_use]
    pub fn builtin_placeholders(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("HOME".to_string(), self.home.display().to_string()),
            ("USER".to_string(), self.user.clone()),
        ])
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    policy: Policy,
    #[serde(default)]
    placeholders: BTreeMap<String, String>,
    #[serde(default)]
    artifacts: Vec<artifacts::ArtifactEntry>,
}

/// All loaded configuration.
#[derive(Debug)]
pub struct Config {
    /// Repository root that relative sources resolve against.
    pub root: PathBuf,
    /// Validated `[policy]` table.
    pub policy: Policy,
    /// Built-in plus `[placeholders]` values.
    pub placeholders: BTreeMap<String, String>,
    /// Artifacts in declaration order.
    pub artifacts: Vec<ConfigurationArtifact>,
}

impl Config {
    /// Load `conf/wsl-setup.toml` under `root`.
    ///
    /// A missing file yields an empty configuration with the default policy.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or if
    /// any artifact is invalid.
    pub fn load(root: &Path, env: &Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml_loader::load_config(&root.join(CONFIG_FILE))?;
        Self::from_raw(raw, root, env)
    }

    /// Build a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn parse(content: &str, root: &Path, env: &Environment) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml_loader::parse_config(content, &root.join(CONFIG_FILE))?;
        Self::from_raw(raw, root, env)
    }

    fn from_raw(raw: RawConfig, root: &Path, env: &Environment) -> Result<Self, ConfigError> {
        check_timestamp_format(&raw.policy.timestamp_format).map_err(|reason| {
            ConfigError::InvalidPolicy {
                field: "timestamp_format",
                reason,
            }
        })?;
        check_backup_tag(&raw.policy.backup_tag).map_err(|reason| ConfigError::InvalidPolicy {
            field: "backup_tag",
            reason,
        })?;

        let mut placeholders = env.builtin_placeholders();
        placeholders.extend(raw.placeholders);

        let artifacts = raw
            .artifacts
            .into_iter()
            .map(|entry| entry.resolve(root, env, &placeholders))
            .collect::<Result<Vec<_>, _>>()?;

        let policy = Policy {
            log_file: raw
                .policy
                .log_file
                .map(|p| artifacts::expand_home(&p.to_string_lossy(), &env.home)),
            ..raw.policy
        };

        Ok(Self {
            root: root.to_path_buf(),
            policy,
            placeholders,
            artifacts,
        })
    }
}
