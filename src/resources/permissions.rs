//! Name-based permission classification for secret trees (e.g. `~/.ssh`).
//!
//! Classification looks only at file names, never at content, so the same
//! tree always ends up with the same modes.
use std::fs;
use std::path::Path;

use crate::artifact::Privilege;
use crate::error::ApplyError;

use super::writer::PrivilegedWriter;

/// Mode for directories inside a secret tree.
pub const SECRET_DIR_MODE: u32 = 0o700;

/// Suffixes that mark a private key when no `.pub` follows.
const PRIVATE_KEY_SUFFIXES: &[&str] = &["_rsa", "_ed25519", "_ecdsa", "_dsa", ".pem"];

/// Category of a file inside a secret tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretClass {
    /// `id_*` without `.pub`, or a key-type suffix without `.pub`.
    PrivateKey,
    /// Anything ending in `.pub`.
    PublicKey,
    /// The client configuration file, `config`.
    Config,
    /// `known_hosts` (and its `.old` rotation).
    KnownHosts,
    /// `authorized_keys`.
    AuthorizedKeys,
}

impl SecretClass {
    /// Classify a file by name, or `None` when the name matches no rule.
    #[must_use]
    pub fn of(name: &str) -> Option<Self> {
        if name.ends_with(".pub") {
            return Some(Self::PublicKey);
        }
        match name {
            "config" => return Some(Self::Config),
            "known_hosts" | "known_hosts.old" => return Some(Self::KnownHosts),
            "authorized_keys" => return Some(Self::AuthorizedKeys),
            _ => {}
        }
        if name.starts_with("id_") || PRIVATE_KEY_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return Some(Self::PrivateKey);
        }
        None
    }

    /// Mode assigned to files of this class.
    #[must_use]
    pub const fn mode(self) -> u32 {
        match self {
            Self::PrivateKey | Self::Config | Self::AuthorizedKeys => 0o600,
            Self::PublicKey | Self::KnownHosts => 0o644,
        }
    }
}

/// Counts of what a classification pass touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyStats {
    /// Files whose mode was set from a [`SecretClass`].
    pub classified: usize,
    /// Directories set to [`SECRET_DIR_MODE`].
    pub directories: usize,
    /// Files that matched no rule and were left alone.
    pub unmatched: usize,
}

/// Assign differentiated modes by file name to the tree at `target`.
///
/// Names are listed from `listing` and modes are set on the same relative
/// paths under `target`.  Applying a tree passes its source as `listing`,
/// which stays readable when `target` is owned by another user; pass the
/// same path twice to classify a tree in place.
///
/// Directories (including `target`) get [`SECRET_DIR_MODE`]; files get the
/// mode of their [`SecretClass`]; unmatched files are left unchanged.
/// Symlinks are never followed or modified.
///
/// # Errors
///
/// Returns an error if a directory of `listing` cannot be read or a mode
/// cannot be set.
pub fn classify_and_chmod(
    listing: &Path,
    target: &Path,
    privilege: Privilege,
    writer: &PrivilegedWriter,
) -> Result<ClassifyStats, ApplyError> {
    let mut stats = ClassifyStats::default();
    walk(listing, target, privilege, writer, &mut stats)?;
    Ok(stats)
}

fn walk(
    listing: &Path,
    target: &Path,
    privilege: Privilege,
    writer: &PrivilegedWriter,
    stats: &mut ClassifyStats,
) -> Result<(), ApplyError> {
    writer.set_mode(target, SECRET_DIR_MODE, privilege)?;
    stats.directories += 1;

    let mut entries: Vec<_> = fs::read_dir(listing)
        .map_err(|e| ApplyError::from_io(listing, e))?
        .collect::<Result<_, _>>()
        .map_err(|e| ApplyError::from_io(listing, e))?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        let file_type = entry
            .file_type()
            .map_err(|e| ApplyError::from_io(&entry.path(), e))?;
        if file_type.is_symlink() {
            continue;
        }
        let dest = target.join(&name);
        if file_type.is_dir() {
            walk(&entry.path(), &dest, privilege, writer, stats)?;
            continue;
        }
        match SecretClass::of(&name.to_string_lossy()) {
            Some(class) => {
                writer.set_mode(&dest, class.mode(), privilege)?;
                stats.classified += 1;
            }
            None => stats.unmatched += 1,
        }
    }
    Ok(())
}
