use std::sync::Arc;

use crate::config::{Elevation, Policy};
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::resources::backup::BackupManager;
use crate::resources::writer::{DirectElevator, ElevatedWriter, PrivilegedWriter, SudoElevator};

/// Shared context for applying artifacts.
pub struct Context {
    /// Detected platform information.
    pub platform: Platform,
    /// Run log for output and summary recording.
    pub log: Arc<dyn Log>,
    /// Privilege-scoped writer for every destination mutation.
    pub writer: PrivilegedWriter,
    /// Backup policy.
    pub backups: BackupManager,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("writer", &self.writer)
            .field("backups", &self.backups)
            .finish()
    }
}

impl Context {
    /// Build a context from the loaded policy.
    #[must_use]
    pub fn new(
        policy: &Policy,
        platform: Platform,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let elevator = select_elevator(policy.elevation, executor);
        Self {
            platform,
            log,
            writer: PrivilegedWriter::new(elevator),
            backups: BackupManager::new(
                policy.backups_enabled,
                &policy.backup_tag,
                &policy.timestamp_format,
            ),
        }
    }
}

/// Choose the elevation mechanism.
///
/// `sudo` is skipped when the process is already root, since it adds
/// nothing and may not be installed in minimal images.
#[must_use]
pub fn select_elevator(
    elevation: Elevation,
    executor: Arc<dyn Executor>,
) -> Arc<dyn ElevatedWriter> {
    match elevation {
        Elevation::None => Arc::new(DirectElevator::new(executor)),
        Elevation::Sudo if is_root(executor.as_ref()) => Arc::new(DirectElevator::new(executor)),
        Elevation::Sudo => Arc::new(SudoElevator::new(executor)),
    }
}

fn is_root(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked("id", &["-u"])
        .is_ok_and(|r| r.success && r.stdout.trim() == "0")
}
