//! Command: render a template to stdout.
use std::collections::BTreeMap;
use std::io::Write as _;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, RenderOpts};
use crate::config::{Config, Environment};
use crate::resources::template;

use super::resolve_root;

/// Run the render command.
///
/// Placeholders come from the built-ins, then the repository's
/// `[placeholders]` when a root can be found, then `--set` values.
///
/// # Errors
///
/// Returns an error if the template cannot be read or the configuration
/// exists but fails to load.
pub fn run(global: &GlobalOpts, opts: &RenderOpts) -> Result<()> {
    let env = Environment::from_env();
    let base = match resolve_root(global) {
        Ok(root) => Config::load(&root, &env)?.placeholders,
        Err(e) => {
            tracing::debug!("no configuration used: {e:#}");
            env.builtin_placeholders()
        }
    };

    let text = std::fs::read_to_string(&opts.template)
        .with_context(|| format!("reading template {}", opts.template.display()))?;
    let placeholders = merge(base, &opts.set);

    for token in template::unresolved_tokens(&text, &placeholders) {
        tracing::warn!("unresolved placeholder left verbatim: {{{{{token}}}}}");
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(template::render(&text, &placeholders).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// `base` overridden by `overrides`, later overrides winning.
fn merge(
    mut base: BTreeMap<String, String>,
    overrides: &[(String, String)],
) -> BTreeMap<String, String> {
    base.extend(overrides.iter().cloned());
    base
}
