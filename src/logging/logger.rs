//! Run log with summary collection.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::types::{ArtifactEntry, ArtifactStatus, Log, STAGE_TARGET, SUCCESS_TARGET};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Run log with summary collection.
///
/// Every message becomes a tracing event.  The installed subscriber writes
/// it to the console and, through the file layer, appends it to the run log
/// file before the call returns.
#[derive(Debug)]
pub struct RunLog {
    artifacts: Mutex<Vec<ArtifactEntry>>,
    log_file: Option<PathBuf>,
}

impl RunLog {
    /// Create a run log.
    ///
    /// `log_file` is only used for display in the summary; the file itself
    /// is opened by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(log_file: Option<&Path>) -> Self {
        Self {
            artifacts: Mutex::new(Vec::new()),
            log_file: log_file.map(Path::to_path_buf),
        }
    }

    /// Return the log file path, if known.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Return a clone of all recorded artifact entries.
    #[must_use]
    pub fn artifact_entries(&self) -> Vec<ArtifactEntry> {
        self.artifacts.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a success message.
    pub fn success(&self, msg: &str) {
        tracing::info!(target: SUCCESS_TARGET, "{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record an artifact result for the summary.
    pub fn record_artifact(&self, name: &str, status: ArtifactStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.artifacts.lock() {
            guard.push(ArtifactEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded artifact has failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the number of failed artifacts.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.artifacts.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|a| a.status == ArtifactStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded artifacts.
    pub fn print_summary(&self) {
        let artifacts = self.artifact_entries();
        if artifacts.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut applied = 0u32;
        let mut not_applicable = 0u32;
        let mut skipped = 0u32;
        let mut failed = 0u32;

        for artifact in &artifacts {
            let (icon, color) = match artifact.status {
                ArtifactStatus::Applied => {
                    applied += 1;
                    ("✓", "\x1b[32m")
                }
                ArtifactStatus::NotApplicable => {
                    not_applicable += 1;
                    ("·", "\x1b[2m")
                }
                ArtifactStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                ArtifactStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = artifact
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", artifact.name));
        }

        let total = applied + not_applicable + skipped + failed;
        self.info(&format!(
            "{total} artifacts: \x1b[32m{applied} applied\x1b[0m, \x1b[2m{not_applicable} n/a\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for RunLog {
    forward_log_methods!(stage, info, success, debug, warn, error);

    fn record_artifact(&self, name: &str, status: ArtifactStatus, message: Option<&str>) {
        self.record_artifact(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_run_log;
    use std::fs;

    #[test]
    fn run_log_new() {
        let (log, _tmp, _guard) = isolated_run_log();
        assert!(log.artifact_entries().is_empty(), "expected empty list");
    }

    #[test]
    fn record_artifact_applied() {
        let (log, _tmp, _guard) = isolated_run_log();
        log.record_artifact("wsl.conf", ArtifactStatus::Applied, None);
        let entries = log.artifact_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "wsl.conf");
        assert_eq!(entries[0].status, ArtifactStatus::Applied);
    }

    #[test]
    fn record_artifact_with_message() {
        let (log, _tmp, _guard) = isolated_run_log();
        log.record_artifact("fstab", ArtifactStatus::Skipped, Some("source missing"));
        assert_eq!(
            log.artifact_entries()[0].message,
            Some("source missing".to_string())
        );
    }

    #[test]
    fn failure_count_counts_only_failed() {
        let (log, _tmp, _guard) = isolated_run_log();
        assert!(!log.has_failures());
        log.record_artifact("a", ArtifactStatus::Applied, None);
        log.record_artifact("b", ArtifactStatus::Failed, Some("error 1"));
        log.record_artifact("c", ArtifactStatus::Failed, Some("error 2"));
        log.record_artifact("d", ArtifactStatus::Skipped, None);
        log.record_artifact("e", ArtifactStatus::NotApplicable, None);
        assert_eq!(log.failure_count(), 2);
        assert!(log.has_failures());
    }

    #[test]
    fn each_message_reaches_file_before_return() {
        let (log, _tmp, _guard) = isolated_run_log();
        let path = log.log_path().expect("log path should exist").to_path_buf();

        log.success("applied wsl.conf");
        let after_success = fs::read_to_string(&path).unwrap();
        assert!(after_success.contains("[success] applied wsl.conf"));

        log.error("fstab: permission denied");
        let after_error = fs::read_to_string(&path).unwrap();
        assert!(after_error.contains("[error] fstab: permission denied"));
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_run_log();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains(&marker));
    }

    #[test]
    fn summary_is_written_with_counts() {
        let (log, _tmp, _guard) = isolated_run_log();
        log.record_artifact("a", ArtifactStatus::Applied, None);
        log.record_artifact("b", ArtifactStatus::Failed, Some("boom"));
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("==> Summary"));
        assert!(contents.contains("✗ b (boom)"));
        assert!(contents.contains("2 artifacts: 1 applied, 0 n/a, 0 skipped, 1 failed"));
    }

    #[test]
    fn log_trait_delegates_to_run_log() {
        let (log, _tmp, _guard) = isolated_run_log();
        let log_ref: &dyn Log = &log;
        log_ref.warn("careful");
        log_ref.record_artifact("x", ArtifactStatus::Applied, None);
        assert_eq!(log.artifact_entries().len(), 1);
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[warn] careful"));
    }
}
