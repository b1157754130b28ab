//! Warning-only checks over a loaded configuration.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::artifact::{ConfigurationArtifact, Privilege, Source};
use crate::resources::template;

use super::{CONFIG_FILE, Config, Environment};

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration source (e.g., "conf/wsl-setup.toml").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.item, self.message)
    }
}

/// Trait for configuration validators.
///
/// Validators report suspicious but loadable configuration; hard errors are
/// raised by the loader instead.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, env: &Environment) -> Vec<ValidationWarning>;
}

/// Flags identities declared more than once.
#[derive(Debug)]
pub struct DuplicateIdentityValidator<'a> {
    artifacts: &'a [ConfigurationArtifact],
}

impl<'a> DuplicateIdentityValidator<'a> {
    /// Check `artifacts`.
    #[must_use]
    pub const fn new(artifacts: &'a [ConfigurationArtifact]) -> Self {
        Self { artifacts }
    }
}

impl ConfigValidator for DuplicateIdentityValidator<'_> {
    fn validate(&self, _env: &Environment) -> Vec<ValidationWarning> {
        let mut seen = BTreeSet::new();
        let mut reported = BTreeSet::new();
        let mut warnings = Vec::new();
        for artifact in self.artifacts {
            let id = artifact.identity.as_str();
            if !seen.insert(id) && reported.insert(id) {
                warnings.push(ValidationWarning::new(
                    CONFIG_FILE,
                    id,
                    "identity is declared more than once; --only/--skip match all of them",
                ));
            }
        }
        warnings
    }
}

/// Flags per-artifact placeholders that the artifact's template never uses.
///
/// Global and built-in placeholders are exempt since they are shared.
#[derive(Debug)]
pub struct UnusedPlaceholderValidator<'a> {
    artifacts: &'a [ConfigurationArtifact],
    globals: &'a BTreeMap<String, String>,
}

impl<'a> UnusedPlaceholderValidator<'a> {
    /// Check `artifacts`; keys in `globals` are never reported.
    #[must_use]
    pub const fn new(
        artifacts: &'a [ConfigurationArtifact],
        globals: &'a BTreeMap<String, String>,
    ) -> Self {
        Self { artifacts, globals }
    }
}

impl ConfigValidator for UnusedPlaceholderValidator<'_> {
    fn validate(&self, _env: &Environment) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for artifact in self.artifacts {
            let text = match &artifact.source {
                Source::Inline(text) => text.clone(),
                // A missing template is reported when the artifact is applied.
                Source::Template(path) => match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Source::File(_) | Source::Tree { .. } => continue,
            };
            let used: BTreeSet<&str> = template::token_names(&text).collect();
            for key in artifact.placeholders.keys() {
                if self.globals.contains_key(key) || used.contains(key.as_str()) {
                    continue;
                }
                warnings.push(ValidationWarning::new(
                    CONFIG_FILE,
                    &artifact.identity,
                    format!("placeholder '{key}' is never referenced by the template"),
                ));
            }
        }
        warnings
    }
}

/// Flags elevated artifacts that target the user's home directory.
#[derive(Debug)]
pub struct PrivilegeScopeValidator<'a> {
    artifacts: &'a [ConfigurationArtifact],
}

impl<'a> PrivilegeScopeValidator<'a> {
    /// Check `artifacts`.
    #[must_use]
    pub const fn new(artifacts: &'a [ConfigurationArtifact]) -> Self {
        Self { artifacts }
    }
}

impl ConfigValidator for PrivilegeScopeValidator<'_> {
    fn validate(&self, env: &Environment) -> Vec<ValidationWarning> {
        if env.home.as_os_str().is_empty() || env.home == Path::new("/") {
            return Vec::new();
        }
        self.artifacts
            .iter()
            .filter(|a| a.privilege == Privilege::Elevated && a.destination.starts_with(&env.home))
            .map(|a| {
                ValidationWarning::new(
                    CONFIG_FILE,
                    &a.identity,
                    format!(
                        "elevated write into the home directory ({}) leaves root-owned files; consider privilege = \"user\"",
                        a.destination.display()
                    ),
                )
            })
            .collect()
    }
}

/// Run every validator over `config`.
#[must_use]
pub fn validate_all(config: &Config, env: &Environment) -> Vec<ValidationWarning> {
    let validators: Vec<Box<dyn ConfigValidator + '_>> = vec![
        Box::new(DuplicateIdentityValidator::new(&config.artifacts)),
        Box::new(UnusedPlaceholderValidator::new(
            &config.artifacts,
            &config.placeholders,
        )),
        Box::new(PrivilegeScopeValidator::new(&config.artifacts)),
    ];
    validators.iter().flat_map(|v| v.validate(env)).collect()
}
