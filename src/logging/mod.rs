//! Logging infrastructure for console output and the durable run log.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::RunLog;
pub use subscriber::{file_dispatch, init_subscriber};
pub use types::{ArtifactEntry, ArtifactStatus, Log, RunLogEntry, Severity};
pub use utils::default_log_path;

/// Create a [`RunLog`] backed by an isolated per-thread tracing subscriber
/// that writes to a log file inside a fresh temp dir.
///
/// Returns a [`tracing::dispatcher::DefaultGuard`] that must be kept alive
/// for the duration of the test; dropping it restores the previous
/// thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_run_log() -> (RunLog, tempfile::TempDir, tracing::dispatcher::DefaultGuard)
{
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("apply.log");
    let dispatch = file_dispatch(&path).expect("failed to create file layer");
    let guard = tracing::dispatcher::set_default(&dispatch);
    (RunLog::new(Some(&path)), tmp, guard)
}
