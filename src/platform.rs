//! Platform and WSL detection.
use std::fmt;
use std::path::Path;

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Any Linux kernel, native or under WSL.
    Linux,
    /// Anything else; system artifacts are still attempted but permissions
    /// may not be representable.
    Other,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// Whether the process runs inside Windows Subsystem for Linux.
    pub is_wsl: bool,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        let os = if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Other
        };
        Self {
            os,
            is_wsl: os == Os::Linux && Self::detect_wsl(),
        }
    }

    /// Create a platform with explicit values (for testing).
    #[must_use]
    pub const fn new(os: Os, is_wsl: bool) -> Self {
        Self { os, is_wsl }
    }

    /// Whether Unix permission bits can be applied.
    #[must_use]
    pub const fn supports_chmod(&self) -> bool {
        cfg!(unix)
    }

    fn detect_wsl() -> bool {
        if std::env::var_os("WSL_DISTRO_NAME").is_some() {
            return true;
        }
        if Path::new("/proc/sys/fs/binfmt_misc/WSLInterop").exists() {
            return true;
        }
        std::fs::read_to_string("/proc/version").is_ok_and(|v| kernel_is_wsl(&v))
    }
}

/// Whether a `/proc/version` string names a Microsoft-built kernel.
fn kernel_is_wsl(version: &str) -> bool {
    version.to_lowercase().contains("microsoft")
}
