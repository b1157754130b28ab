//! Build script: embeds the release version for `commands::version`.

use std::process::Command;

/// Name of the compile-time variable `commands::version` reads.
const VERSION_VAR: &str = "WSL_SETUP_VERSION";

/// Version to embed: the release-supplied value, else `git describe` of the
/// checkout this crate sits at the top of.
fn detect_version() -> Option<String> {
    if let Ok(version) = std::env::var(VERSION_VAR) {
        return Some(version);
    }
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|v| !v.is_empty())
}

fn main() {
    if let Some(version) = detect_version() {
        println!("cargo:rustc-env={VERSION_VAR}={version}");
    }

    // The crate root is the repository root, so git metadata sits beside Cargo.toml.
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed={VERSION_VAR}");
}
