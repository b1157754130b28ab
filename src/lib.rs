//! Idempotent, backup-safe configuration engine for WSL environments.
//!
//! Applies configuration artifacts (system files like `/etc/wsl.conf` and
//! `/etc/fstab`, and user dotfile trees like `~/.ssh`) declared in
//! `conf/wsl-setup.toml`: each existing destination is backed up, the
//! artifact is rendered or copied into place, and modes and ownership are
//! fixed, with every action recorded in a run log.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: parse and validate the TOML configuration
//! - **[`resources`]**: rendering, backups, privilege-scoped writes, permissions
//! - **[`applier`]**: the per-artifact apply pipeline and run loop
//! - **[`commands`]**: top-level subcommand orchestration (`apply`, `list`, `render`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod applier;
pub mod artifact;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod resources;
