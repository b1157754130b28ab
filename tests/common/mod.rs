// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed repository and home directory plus a
// fluent builder, so each integration test can set up an isolated
// environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wsl_setup::commands::CommandSetup;
use wsl_setup::config::{Config, Environment};
use wsl_setup::error::ApplyError;
use wsl_setup::exec::{ExecResult, Executor};
use wsl_setup::logging::{RunLog, file_dispatch};
use wsl_setup::platform::{Os, Platform};
use wsl_setup::resources::writer::ElevatedWriter;

/// An isolated repository and home directory backed by a
/// [`tempfile::TempDir`].
///
/// Layout: `<tmp>/repo` holds `conf/` and sources, `<tmp>/home` stands in
/// for `$HOME`, and `<tmp>/apply.log` is the run log.
#[derive(Debug)]
pub struct IntegrationTestContext {
    pub tmp: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with empty `repo/conf` and `home` directories.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(tmp.path().join("repo/conf")).expect("create conf dir");
        std::fs::create_dir_all(tmp.path().join("home")).expect("create home dir");
        Self { tmp }
    }

    /// Path to the repository root.
    pub fn root_path(&self) -> PathBuf {
        self.tmp.path().join("repo")
    }

    /// Path to the stand-in home directory.
    pub fn home_path(&self) -> PathBuf {
        self.tmp.path().join("home")
    }

    /// Path to the run log.
    pub fn log_path(&self) -> PathBuf {
        self.tmp.path().join("apply.log")
    }

    /// Environment pointing `HOME` at [`Self::home_path`].
    pub fn env(&self) -> Environment {
        Environment {
            home: self.home_path(),
            user: "tester".to_string(),
        }
    }

    /// Load the repository configuration.
    pub fn load_config(&self) -> Config {
        Config::load(&self.root_path(), &self.env()).expect("load config")
    }

    /// Command setup on a non-WSL Linux platform.
    pub fn setup(&self) -> CommandSetup {
        self.setup_for_platform(Platform::new(Os::Linux, false))
    }

    /// Command setup on the given platform.
    pub fn setup_for_platform(&self, platform: Platform) -> CommandSetup {
        CommandSetup {
            platform,
            env: self.env(),
            config: self.load_config(),
        }
    }

    /// A run log writing to [`Self::log_path`] for the current thread.
    ///
    /// Keep the returned guard alive for the duration of the test.
    pub fn run_log(&self) -> (Arc<RunLog>, tracing::dispatcher::DefaultGuard) {
        let path = self.log_path();
        let dispatch = file_dispatch(&path).expect("open run log");
        let guard = tracing::dispatcher::set_default(&dispatch);
        (Arc::new(RunLog::new(Some(&path))), guard)
    }

    /// Current contents of the run log.
    pub fn log_contents(&self) -> String {
        std::fs::read_to_string(self.log_path()).expect("read run log")
    }

    /// Read a file relative to the stand-in home directory.
    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home_path().join(rel)).expect("read home file")
    }
}

/// Fluent builder for [`IntegrationTestContext`].
#[derive(Debug)]
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Write `conf/wsl-setup.toml`.  `@HOME@` and `@TMP@` are replaced with
    /// the stand-in home and temp directory paths.
    pub fn with_config(self, content: &str) -> Self {
        let content = content
            .replace("@HOME@", &self.ctx.home_path().display().to_string())
            .replace("@TMP@", &self.ctx.tmp.path().display().to_string());
        let path = self.ctx.root_path().join("conf/wsl-setup.toml");
        std::fs::write(path, content).expect("write config file");
        self
    }

    /// Write a source file relative to the repository root.
    pub fn with_repo_file(self, rel: &str, content: &str) -> Self {
        write_file(&self.ctx.root_path().join(rel), content);
        self
    }

    /// Write a pre-existing file relative to the stand-in home directory.
    pub fn with_home_file(self, rel: &str, content: &str) -> Self {
        write_file(&self.ctx.home_path().join(rel), content);
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write file");
}

/// Elevation mechanism that refuses every operation, standing in for a
/// `sudo` that cannot be used.
#[derive(Debug)]
pub struct DenyAllElevator;

impl ElevatedWriter for DenyAllElevator {
    fn write(&self, path: &Path, _: &[u8]) -> Result<(), ApplyError> {
        Err(ApplyError::PermissionDenied {
            path: path.to_path_buf(),
        })
    }

    fn copy(&self, _: &Path, dst: &Path) -> Result<(), ApplyError> {
        Err(ApplyError::PermissionDenied {
            path: dst.to_path_buf(),
        })
    }

    fn set_mode(&self, path: &Path, _: u32) -> Result<(), ApplyError> {
        Err(ApplyError::PermissionDenied {
            path: path.to_path_buf(),
        })
    }

    fn chown(&self, path: &Path, _: &str, _: bool) -> Result<(), ApplyError> {
        Err(ApplyError::PermissionDenied {
            path: path.to_path_buf(),
        })
    }
}

/// Executor that never spawns anything and reports success with no output.
#[derive(Debug, Default)]
pub struct NoopExecutor;

impl Executor for NoopExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.run_unchecked(program, args)
    }

    fn run_unchecked(&self, _: &str, _: &[&str]) -> anyhow::Result<ExecResult> {
        Ok(ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        })
    }

    fn which(&self, _: &str) -> bool {
        false
    }
}
