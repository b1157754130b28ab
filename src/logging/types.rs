//! Core logging types: severities, run-log entries, artifact summaries, and
//! the [`Log`] trait.
use std::fmt;

/// Tracing target for stage headers.
pub const STAGE_TARGET: &str = "wsl_setup::stage";

/// Tracing target for success events (INFO level).
pub const SUCCESS_TARGET: &str = "wsl_setup::success";

/// Severity of a durable run-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress information.
    Info,
    /// An action completed.
    Success,
    /// Something was skipped or looks suspicious.
    Warn,
    /// An action failed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One line of the run log: `[timestamp] [severity] message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEntry {
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Entry severity.
    pub severity: Severity,
    /// Message with ANSI codes stripped.
    pub message: String,
}

impl fmt::Display for RunLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [{}] {}", self.timestamp, self.severity, self.message)
    }
}

/// Per-artifact result for summary reporting.
#[derive(Debug, Clone)]
pub struct ArtifactEntry {
    /// Artifact identity.
    pub name: String,
    /// Final status of the artifact.
    pub status: ArtifactStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a processed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Destination was written.
    Applied,
    /// Artifact does not apply to this platform.
    NotApplicable,
    /// Artifact was skipped (missing source, already up to date, aborted run).
    Skipped,
    /// Artifact could not be applied.
    Failed,
}

/// Abstraction over the run log.
///
/// Engine code logs through this trait so that it does not depend on how
/// events reach the console and the log file.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a success message.
    fn success(&self, msg: &str);
    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record an artifact result for the summary.
    fn record_artifact(&self, name: &str, status: ArtifactStatus, message: Option<&str>);

    /// Log `msg` at `severity`.
    fn log(&self, severity: Severity, msg: &str) {
        match severity {
            Severity::Info => self.info(msg),
            Severity::Success => self.success(msg),
            Severity::Warn => self.warn(msg),
            Severity::Error => self.error(msg),
        }
    }
}
