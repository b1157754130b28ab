//! Command: list configured artifacts.
use std::fmt::Write as _;

use anyhow::Result;

use crate::artifact::{ConfigurationArtifact, Source};
use crate::cli::GlobalOpts;

use super::CommandSetup;

/// Run the list command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts) -> Result<()> {
    let setup = CommandSetup::load(global)?;
    for warning in setup.warnings() {
        tracing::warn!("{warning}");
    }
    print!("{}", format_artifacts(&setup.config.artifacts));
    Ok(())
}

fn source_kind(source: &Source) -> &'static str {
    match source {
        Source::Template(_) => "template",
        Source::Inline(_) => "content",
        Source::File(_) => "file",
        Source::Tree { secret: true, .. } => "tree (secret)",
        Source::Tree { secret: false, .. } => "tree",
    }
}

/// One line per artifact: identity, privilege, mode, source kind,
/// destination, and flags.
#[must_use]
pub fn format_artifacts(artifacts: &[ConfigurationArtifact]) -> String {
    let width = artifacts
        .iter()
        .map(|a| a.identity.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for a in artifacts {
        let mut flags = Vec::new();
        if a.required {
            flags.push("required");
        }
        if a.wsl_only {
            flags.push("wsl-only");
        }
        if a.ensure_lines {
            flags.push("ensure-lines");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:<8}  {:04o}  {:<13}  {}{flags}",
            a.identity,
            a.privilege.to_string(),
            a.mode,
            source_kind(&a.source),
            a.destination.display(),
        );
    }
    out
}
