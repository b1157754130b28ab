//! Subcommand implementations and the setup they share.
pub mod apply;
pub mod list;
pub mod render;
pub mod version;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::artifact::ConfigurationArtifact;
use crate::cli::GlobalOpts;
use crate::config::validation::{ValidationWarning, validate_all};
use crate::config::{CONFIG_FILE, Config, Environment};
use crate::logging::Log;
use crate::platform::Platform;

/// Environment variable naming the repository root.
pub const ROOT_ENV: &str = "WSL_SETUP_ROOT";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, root resolution, and configuration
/// loading so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Home directory and user name from the process environment.
    pub env: Environment,
    /// Loaded configuration.
    pub config: Config,
}

impl CommandSetup {
    /// Detect the platform, resolve the root, and load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be determined or the
    /// configuration fails to load.
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let root = resolve_root(global)?;
        let env = Environment::from_env();
        let config = Config::load(&root, &env)
            .with_context(|| format!("loading {}", root.join(CONFIG_FILE).display()))?;
        Ok(Self {
            platform: Platform::detect(),
            env,
            config,
        })
    }

    /// Configuration warnings for this setup.
    #[must_use]
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        validate_all(&self.config, &self.env)
    }

    /// Log what was loaded, including any configuration warnings.
    pub fn report(&self, log: &dyn Log) {
        log.stage("Loading configuration");
        log.info(&format!("root: {}", self.config.root.display()));
        log.info(&format!(
            "platform: {}{}",
            self.platform.os,
            if self.platform.is_wsl { " (WSL)" } else { "" }
        ));
        log.info(&format!("loaded {} artifacts", self.config.artifacts.len()));
        log.debug(&format!(
            "{} global placeholders",
            self.config.placeholders.len()
        ));

        let warnings = self.warnings();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }
    }
}

/// Resolve the repository root from CLI arguments or auto-detection.
///
/// # Errors
///
/// Returns an error if the root directory cannot be determined or doesn't exist.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading the current directory")?;
    resolve_root_from(global.root.as_deref(), std::env::var_os(ROOT_ENV), &cwd)
}

/// Root resolution with the ambient inputs passed in: `--root`, then
/// `WSL_SETUP_ROOT`, then `cwd` when it holds the config file.
///
/// # Errors
///
/// Returns an error if no candidate applies or the chosen root does not exist.
pub fn resolve_root_from(
    explicit: Option<&Path>,
    env_root: Option<OsString>,
    cwd: &Path,
) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return dunce::canonicalize(root)
            .with_context(|| format!("root directory {} does not exist", root.display()));
    }

    if let Some(root) = env_root.filter(|r| !r.is_empty()) {
        let root = PathBuf::from(root);
        return dunce::canonicalize(&root)
            .with_context(|| format!("{ROOT_ENV} directory {} does not exist", root.display()));
    }

    if cwd.join(CONFIG_FILE).exists() {
        return Ok(cwd.to_path_buf());
    }

    anyhow::bail!("cannot determine repository root. Use --root or set {ROOT_ENV}");
}

/// Select artifacts by `--only` / `--skip` identities (case-insensitive).
///
/// `--only` wins when both are given.  Declaration order is preserved.
#[must_use]
pub fn filter_artifacts(
    artifacts: &[ConfigurationArtifact],
    only: &[String],
    skip: &[String],
) -> Vec<ConfigurationArtifact> {
    let matches = |names: &[String], id: &str| names.iter().any(|n| n.eq_ignore_ascii_case(id));
    artifacts
        .iter()
        .filter(|a| {
            if !only.is_empty() {
                return matches(only, &a.identity);
            }
            !matches(skip, &a.identity)
        })
        .cloned()
        .collect()
}

/// Names in `requested` that match no artifact.
#[must_use]
pub fn unknown_identities<'a>(
    artifacts: &[ConfigurationArtifact],
    requested: &'a [String],
) -> Vec<&'a str> {
    requested
        .iter()
        .filter(|n| !artifacts.iter().any(|a| a.identity.eq_ignore_ascii_case(n)))
        .map(String::as_str)
        .collect()
}
