//! Command-line interface definitions.
use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the WSL configuration engine.
#[derive(Parser, Debug)]
#[command(
    name = "wsl-setup",
    about = "Idempotent first-run configuration for WSL environments",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Override the repository root (defaults to $WSL_SETUP_ROOT, then the current directory)
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply configured artifacts in declaration order
    Apply(ApplyOpts),
    /// List configured artifacts
    List,
    /// Render a template to stdout
    Render(RenderOpts),
    /// Print version information
    Version,
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ApplyOpts {
    /// Apply only these artifacts (comma-separated identities)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these artifacts (comma-separated identities)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Overwrite without taking backups
    #[arg(long)]
    pub no_backup: bool,
}

/// Options for the `render` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RenderOpts {
    /// Template file to render
    pub template: std::path::PathBuf,

    /// Extra placeholder value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

/// Parse `KEY=VALUE`; the value may itself contain `=`.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
