//! Utility functions for path resolution, ANSI stripping, and time formatting.
use std::path::PathBuf;

/// File name of the run log inside the cache directory.
pub const LOG_FILE_NAME: &str = "apply.log";

/// Strip ANSI escape sequences from a string.
///
/// Handles SGR sequences (ending in `m`) and other CSI sequences (ending
/// in any letter in the `@`..`~` range), so cursor movement, erase, etc.
/// are also stripped without consuming unrelated text.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for inner in chars.by_ref() {
                    if ('@'..='~').contains(&inner) {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Return the default run-log path:
/// `$XDG_CACHE_HOME/wsl-setup/apply.log`, falling back to
/// `$HOME/.cache/wsl-setup/apply.log`.
///
/// The directory is not created here; the file layer creates it when it
/// opens the log.
#[must_use]
pub fn default_log_path() -> PathBuf {
    let cache_dir = std::env::var_os("XDG_CACHE_HOME").map_or_else(
        || {
            std::env::var_os("HOME")
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    cache_dir.join("wsl-setup").join(LOG_FILE_NAME)
}

/// Format the current local time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_local_datetime() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
