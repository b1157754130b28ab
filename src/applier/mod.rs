//! The idempotent applier: existence check, backup, render, write, mode
//! fix, ownership fix, and outcome log for each artifact.
mod context;

pub use context::{Context, select_elevator};

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

use crate::artifact::{ConfigurationArtifact, Source};
use crate::error::ApplyError;
use crate::logging::ArtifactStatus;
use crate::resources::helpers::fs::path_exists;
use crate::resources::permissions::{SECRET_DIR_MODE, classify_and_chmod};
use crate::resources::template;

/// Reason recorded for artifacts skipped after a required one failed.
pub const ABORTED_REASON: &str = "aborted after required artifact failed";

/// Reason recorded for `ensure_lines` artifacts with nothing to add.
pub const UP_TO_DATE_REASON: &str = "already up to date";

/// Reason recorded for WSL-only artifacts outside WSL.
pub const NOT_WSL_REASON: &str = "requires WSL";

/// Outcome of applying one artifact.
#[derive(Debug)]
pub enum ApplyResult {
    /// The destination now holds the artifact.
    Applied {
        /// Backup taken before the overwrite, if any.
        backup: Option<PathBuf>,
    },
    /// Nothing was written.
    Skipped {
        /// Why the artifact was skipped.
        reason: String,
    },
    /// The artifact could not be applied; the destination is unchanged
    /// unless the failure came after the write (mode or ownership).
    Failed(ApplyError),
}

impl ApplyResult {
    /// Summary status for the run log.
    #[must_use]
    pub const fn status(&self) -> ArtifactStatus {
        match self {
            Self::Applied { .. } => ArtifactStatus::Applied,
            Self::Skipped { .. } => ArtifactStatus::Skipped,
            Self::Failed(_) => ArtifactStatus::Failed,
        }
    }
}

/// Content resolved from an artifact's source, ready to write.
enum Payload {
    Bytes(Vec<u8>),
    Tree { path: PathBuf, secret: bool },
}

/// Applies artifacts one at a time, in order.
#[derive(Debug)]
pub struct Applier<'a> {
    ctx: &'a Context,
}

impl<'a> Applier<'a> {
    /// Create an applier bound to `ctx`.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Apply every artifact in declaration order and record each outcome.
    ///
    /// A failure does not stop later artifacts unless the failed artifact
    /// is marked `required`; then every remaining artifact is skipped.
    pub fn run(&self, artifacts: &[ConfigurationArtifact]) -> Vec<(String, ApplyResult)> {
        let log = &self.ctx.log;
        let mut results = Vec::with_capacity(artifacts.len());
        let mut aborted = false;

        for artifact in artifacts {
            let id = artifact.identity.as_str();

            if aborted {
                log.record_artifact(id, ArtifactStatus::Skipped, Some(ABORTED_REASON));
                results.push((
                    id.to_string(),
                    ApplyResult::Skipped {
                        reason: ABORTED_REASON.to_string(),
                    },
                ));
                continue;
            }

            if artifact.wsl_only && !self.ctx.platform.is_wsl {
                log.debug(&format!("skipping artifact: {id} (not applicable)"));
                log.record_artifact(id, ArtifactStatus::NotApplicable, None);
                results.push((
                    id.to_string(),
                    ApplyResult::Skipped {
                        reason: NOT_WSL_REASON.to_string(),
                    },
                ));
                continue;
            }

            let result = self.apply(artifact);
            match &result {
                ApplyResult::Applied { .. } => {
                    log.record_artifact(id, ArtifactStatus::Applied, None);
                }
                ApplyResult::Skipped { reason } => {
                    log.record_artifact(id, ArtifactStatus::Skipped, Some(reason));
                }
                ApplyResult::Failed(e) => {
                    log.record_artifact(id, ArtifactStatus::Failed, Some(&e.to_string()));
                    if artifact.required {
                        log.error(&format!(
                            "{id} is required; skipping the remaining artifacts"
                        ));
                        aborted = true;
                    }
                }
            }
            results.push((id.to_string(), result));
        }
        results
    }

    /// Apply a single artifact and log its outcome.
    ///
    /// Errors never escape: they become [`ApplyResult::Failed`], except a
    /// missing source which becomes [`ApplyResult::Skipped`] with a warning.
    pub fn apply(&self, artifact: &ConfigurationArtifact) -> ApplyResult {
        let log = &self.ctx.log;
        log.stage(&artifact.identity);
        log.debug(&artifact.description());

        match self.try_apply(artifact) {
            Ok(ApplyResult::Applied { backup }) => {
                match &backup {
                    Some(path) => log.success(&format!(
                        "{}: applied {} (backup: {})",
                        artifact.identity,
                        artifact.destination.display(),
                        path.display()
                    )),
                    None => log.success(&format!(
                        "{}: applied {}",
                        artifact.identity,
                        artifact.destination.display()
                    )),
                }
                ApplyResult::Applied { backup }
            }
            Ok(ApplyResult::Skipped { reason }) => {
                log.info(&format!("{}: skipped: {reason}", artifact.identity));
                ApplyResult::Skipped { reason }
            }
            Ok(failed @ ApplyResult::Failed(_)) => failed,
            Err(e @ ApplyError::SourceMissing { .. }) => {
                log.warn(&format!("{}: skipped: {e}", artifact.identity));
                ApplyResult::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                log.error(&format!("{}: {}", artifact.identity, error_chain(&e)));
                ApplyResult::Failed(e)
            }
        }
    }

    fn try_apply(&self, artifact: &ConfigurationArtifact) -> Result<ApplyResult, ApplyError> {
        let ctx = self.ctx;
        let dest = artifact.destination.as_path();
        let privilege = artifact.privilege;

        let payload = self.load_payload(artifact)?;
        let exists = path_exists(dest);

        let payload = match payload {
            Payload::Bytes(rendered) if artifact.ensure_lines => {
                let existing = if exists { read_existing(dest)? } else { String::new() };
                match append_missing_lines(&existing, &String::from_utf8_lossy(&rendered)) {
                    Some(merged) => Payload::Bytes(merged.into_bytes()),
                    None => {
                        return Ok(ApplyResult::Skipped {
                            reason: UP_TO_DATE_REASON.to_string(),
                        });
                    }
                }
            }
            other => other,
        };

        if exists && let Payload::Bytes(bytes) = &payload {
            self.note_unchanged(dest, bytes);
        }

        let backup = ctx.backups.backup(dest, privilege, &ctx.writer)?;
        if let Some(path) = &backup {
            ctx.log.debug(&format!("backed up {} to {}", dest.display(), path.display()));
        }

        match &payload {
            Payload::Bytes(bytes) => ctx.writer.write(dest, bytes, privilege)?,
            Payload::Tree { path, .. } => ctx.writer.copy(path, dest, privilege)?,
        }

        self.fix_modes(artifact, &payload)?;

        if let Some(owner) = &artifact.owner {
            ctx.writer
                .chown(dest, owner, matches!(payload, Payload::Tree { .. }))?;
        }

        Ok(ApplyResult::Applied { backup })
    }

    /// Read the source and render it when it is a template.
    fn load_payload(&self, artifact: &ConfigurationArtifact) -> Result<Payload, ApplyError> {
        let text = match &artifact.source {
            Source::Template(path) => fs::read_to_string(path).map_err(|e| source_error(path, e))?,
            Source::Inline(text) => text.clone(),
            Source::File(path) => {
                return fs::read(path)
                    .map(Payload::Bytes)
                    .map_err(|e| source_error(path, e));
            }
            Source::Tree { path, secret } => {
                if !path.is_dir() {
                    return Err(ApplyError::SourceMissing { path: path.clone() });
                }
                return Ok(Payload::Tree {
                    path: path.clone(),
                    secret: *secret,
                });
            }
        };

        let unresolved = template::unresolved_tokens(&text, &artifact.placeholders);
        if !unresolved.is_empty() {
            self.ctx.log.warn(&format!(
                "{}: unresolved placeholders left verbatim: {}",
                artifact.identity,
                unresolved.join(", ")
            ));
        }
        Ok(Payload::Bytes(
            template::render(&text, &artifact.placeholders).into_bytes(),
        ))
    }

    /// Log when the new content matches what is already there; the backup
    /// is still taken.
    fn note_unchanged(&self, dest: &Path, bytes: &[u8]) {
        let Ok(existing) = fs::read(dest) else {
            return;
        };
        if Sha256::digest(&existing) == Sha256::digest(bytes) {
            self.ctx.log.debug(&format!(
                "{} is unchanged; its backup will duplicate the previous content",
                dest.display()
            ));
        }
    }

    fn fix_modes(
        &self,
        artifact: &ConfigurationArtifact,
        payload: &Payload,
    ) -> Result<(), ApplyError> {
        let ctx = self.ctx;
        let dest = artifact.destination.as_path();
        let privilege = artifact.privilege;

        if !ctx.platform.supports_chmod() {
            return Ok(());
        }

        if let Payload::Tree { path, secret: true } = payload {
            let stats = classify_and_chmod(path, dest, privilege, &ctx.writer)?;
            ctx.log.debug(&format!(
                "{}: {} files classified, {} directories, {} unmatched",
                artifact.identity, stats.classified, stats.directories, stats.unmatched
            ));
            if artifact.mode == SECRET_DIR_MODE {
                return Ok(());
            }
        }
        ctx.writer.set_mode(dest, artifact.mode, privilege)
    }
}

/// Map a source read failure, keeping "not found" as [`ApplyError::SourceMissing`].
fn source_error(path: &Path, e: std::io::Error) -> ApplyError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ApplyError::SourceMissing {
            path: path.to_path_buf(),
        }
    } else {
        ApplyError::from_io(path, e)
    }
}

fn read_existing(dest: &Path) -> Result<String, ApplyError> {
    fs::read(dest)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| ApplyError::from_io(dest, e))
}

/// Append the lines of `wanted` missing from `existing`.
///
/// Lines compare with trailing whitespace ignored; blank lines in `wanted`
/// are ignored.  Returns `None` when nothing is missing.
fn append_missing_lines(existing: &str, wanted: &str) -> Option<String> {
    let present: Vec<&str> = existing.lines().map(str::trim_end).collect();
    let mut missing: Vec<&str> = Vec::new();
    for line in wanted.lines().map(str::trim_end) {
        if !line.is_empty() && !present.contains(&line) && !missing.contains(&line) {
            missing.push(line);
        }
    }
    if missing.is_empty() {
        return None;
    }

    let mut merged = existing.to_string();
    if !merged.is_empty() && !merged.ends_with('\n') {
        merged.push('\n');
    }
    for line in missing {
        merged.push_str(line);
        merged.push('\n');
    }
    Some(merged)
}

/// `error: cause: cause` for errors with a source chain.
fn error_chain(e: &ApplyError) -> String {
    let mut out = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::artifact::Privilege;
    use crate::logging::{RunLog, isolated_run_log};
    use crate::platform::{Os, Platform};
    use crate::resources::backup::{BackupManager, list_backups, test_helpers::FixedClock};
    use crate::resources::writer::test_helpers::{DenyingElevator, RecordingElevator};
    use crate::resources::writer::{ElevatedWriter, PrivilegedWriter};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn context(log: Arc<RunLog>, elevator: Arc<dyn ElevatedWriter>, backups: bool) -> Context {
        Context {
            platform: Platform::new(Os::Linux, false),
            log,
            writer: PrivilegedWriter::new(elevator),
            backups: BackupManager::with_clock(
                backups,
                "backup",
                "%Y%m%d_%H%M%S",
                Box::new(FixedClock("20261018_120000".to_string())),
            ),
        }
    }

    fn inline(identity: &str, text: &str, dest: &Path) -> ConfigurationArtifact {
        ConfigurationArtifact {
            identity: identity.to_string(),
            source: Source::Inline(text.to_string()),
            destination: dest.to_path_buf(),
            placeholders: BTreeMap::new(),
            privilege: Privilege::User,
            mode: 0o644,
            owner: None,
            ensure_lines: false,
            required: false,
            wsl_only: false,
        }
    }

    fn setup(
        backups: bool,
    ) -> (
        Context,
        Arc<RunLog>,
        tempfile::TempDir,
        tracing::dispatcher::DefaultGuard,
    ) {
        let (log, tmp, guard) = isolated_run_log();
        let log = Arc::new(log);
        let ctx = context(
            Arc::clone(&log),
            Arc::new(DenyingElevator::PermissionDenied),
            backups,
        );
        (ctx, log, tmp, guard)
    }

    #[test]
    fn end_to_end_template_apply_with_backup() {
        let (ctx, _log, dir, _guard) = setup(true);
        let dest = dir.path().join("test.conf");
        fs::write(&dest, "A=1").unwrap();

        let mut artifact = inline("test.conf", "B={{VAL}}", &dest);
        artifact
            .placeholders
            .insert("VAL".to_string(), "2".to_string());

        let result = Applier::new(&ctx).apply(&artifact);
        assert!(matches!(result, ApplyResult::Applied { backup: Some(_) }));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "B=2");

        let backups = list_backups(&dest, "backup").unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "A=1");
    }

    #[test]
    fn absent_destination_gets_no_backup() {
        let (ctx, _log, dir, _guard) = setup(true);
        let dest = dir.path().join("new.conf");
        let result = Applier::new(&ctx).apply(&inline("new", "x=1", &dest));
        assert!(matches!(result, ApplyResult::Applied { backup: None }));
        assert!(list_backups(&dest, "backup").unwrap().is_empty());
    }

    #[test]
    fn disabled_backups_never_create_files() {
        let (ctx, _log, dir, _guard) = setup(false);
        let dest = dir.path().join("x.conf");
        fs::write(&dest, "old").unwrap();
        let applier = Applier::new(&ctx);
        applier.apply(&inline("x", "new", &dest));
        applier.apply(&inline("x", "new", &dest));
        assert!(list_backups(&dest, "backup").unwrap().is_empty());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn reapply_backs_up_again_with_collision_suffix() {
        let (ctx, _log, dir, _guard) = setup(true);
        let dest = dir.path().join("x.conf");
        fs::write(&dest, "old").unwrap();
        let applier = Applier::new(&ctx);
        applier.apply(&inline("x", "new", &dest));
        applier.apply(&inline("x", "new", &dest));
        let backups = list_backups(&dest, "backup").unwrap();
        assert_eq!(backups.len(), 2, "backups are taken on every overwrite");
        let contents: Vec<String> = backups
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect();
        assert!(contents.contains(&"old".to_string()));
        assert!(contents.contains(&"new".to_string()));
    }

    #[test]
    fn missing_template_is_skipped_with_warning() {
        let (ctx, log, dir, _guard) = setup(true);
        let dest = dir.path().join("out.conf");
        let mut artifact = inline("tpl", "", &dest);
        artifact.source = Source::Template(dir.path().join("missing.tpl"));

        let result = Applier::new(&ctx).apply(&artifact);
        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(!dest.exists());
        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[warn] tpl: skipped: source not found"));
    }

    #[test]
    fn failed_artifact_does_not_block_the_next() {
        let (ctx, log, dir, _guard) = setup(true);
        let mut system = inline("system", "x", &dir.path().join("etc/wsl.conf"));
        system.privilege = Privilege::Elevated;
        let user = inline("user", "y", &dir.path().join("home/.bash_aliases"));

        let results = Applier::new(&ctx).run(&[system, user]);
        assert!(matches!(results[0].1, ApplyResult::Failed(_)));
        assert!(matches!(results[1].1, ApplyResult::Applied { .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join("home/.bash_aliases")).unwrap(),
            "y"
        );

        let contents = fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("[error] system: permission denied"));
        assert!(contents.contains("[success] user: applied"));
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn required_failure_skips_the_rest() {
        let (ctx, log, dir, _guard) = setup(true);
        let mut system = inline("mount", "x", &dir.path().join("etc/fstab"));
        system.privilege = Privilege::Elevated;
        system.required = true;
        let later = inline("later", "y", &dir.path().join("later"));

        let results = Applier::new(&ctx).run(&[system, later]);
        assert!(
            matches!(&results[1].1, ApplyResult::Skipped { reason } if reason == ABORTED_REASON)
        );
        assert!(!dir.path().join("later").exists());
        let entries = log.artifact_entries();
        assert_eq!(entries[1].status, ArtifactStatus::Skipped);
    }

    #[test]
    fn wsl_only_artifacts_are_not_applicable_outside_wsl() {
        let (ctx, log, dir, _guard) = setup(true);
        let mut artifact = inline("wsl.conf", "x", &dir.path().join("wsl.conf"));
        artifact.wsl_only = true;
        Applier::new(&ctx).run(&[artifact]);
        assert!(!dir.path().join("wsl.conf").exists());
        assert_eq!(
            log.artifact_entries()[0].status,
            ArtifactStatus::NotApplicable
        );
    }

    #[test]
    fn backup_failure_aborts_before_overwrite() {
        let (ctx, _log, dir, _guard) = setup(true);
        let dest = dir.path().join("fstab");
        fs::write(&dest, "original").unwrap();
        let mut artifact = inline("fstab", "replacement", &dest);
        artifact.privilege = Privilege::Elevated;

        let result = Applier::new(&ctx).apply(&artifact);
        assert!(matches!(
            result,
            ApplyResult::Failed(ApplyError::BackupFailed { .. })
        ));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "original");
    }

    #[test]
    fn ensure_lines_appends_only_missing_lines() {
        let (ctx, _log, dir, _guard) = setup(true);
        let dest = dir.path().join("fstab");
        fs::write(&dest, "LABEL=root / ext4 defaults 0 1").unwrap();
        let mut artifact = inline(
            "fstab",
            "LABEL=root / ext4 defaults 0 1\n/dev/sdc /mnt/data ext4 defaults 0 2\n",
            &dest,
        );
        artifact.ensure_lines = true;

        let applier = Applier::new(&ctx);
        let first = applier.apply(&artifact);
        assert!(matches!(first, ApplyResult::Applied { backup: Some(_) }));
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "LABEL=root / ext4 defaults 0 1\n/dev/sdc /mnt/data ext4 defaults 0 2\n"
        );

        let second = applier.apply(&artifact);
        assert!(
            matches!(&second, ApplyResult::Skipped { reason } if reason == UP_TO_DATE_REASON)
        );
        assert_eq!(list_backups(&dest, "backup").unwrap().len(), 1);
    }

    #[test]
    fn file_source_is_copied_verbatim() {
        let (ctx, _log, dir, _guard) = setup(true);
        let src = dir.path().join("aliases");
        fs::write(&src, "echo {{NOT_A_TOKEN}}").unwrap();
        let dest = dir.path().join("out/.bash_aliases");
        let mut artifact = inline("aliases", "", &dest);
        artifact.source = Source::File(src);

        Applier::new(&ctx).apply(&artifact);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "echo {{NOT_A_TOKEN}}");
    }

    #[cfg(unix)]
    #[test]
    fn secret_tree_gets_classified_modes() {
        use std::os::unix::fs::PermissionsExt as _;

        let (ctx, _log, dir, _guard) = setup(true);
        let src = dir.path().join("ssh-src");
        fs::create_dir_all(&src).unwrap();
        for name in ["id_rsa", "id_rsa.pub", "config", "known_hosts"] {
            fs::write(src.join(name), name).unwrap();
        }
        let dest = dir.path().join("home/.ssh");
        let mut artifact = inline("ssh", "", &dest);
        artifact.source = Source::Tree {
            path: src,
            secret: true,
        };
        artifact.mode = 0o700;

        let result = Applier::new(&ctx).apply(&artifact);
        assert!(matches!(result, ApplyResult::Applied { .. }));

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&dest.join("id_rsa")), 0o600);
        assert_eq!(mode(&dest.join("id_rsa.pub")), 0o644);
        assert_eq!(mode(&dest.join("config")), 0o600);
        assert_eq!(mode(&dest.join("known_hosts")), 0o644);
        assert_eq!(mode(&dest), 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn elevated_secret_tree_is_classified_from_the_source_names() {
        let (log, dir, _guard) = isolated_run_log();
        let elevator = Arc::new(RecordingElevator::default());
        let ctx = context(
            Arc::new(log),
            Arc::clone(&elevator) as Arc<dyn ElevatedWriter>,
            true,
        );
        let src = dir.path().join("ssh-src");
        fs::create_dir_all(&src).unwrap();
        for name in ["id_rsa.pub", "config", "id_rsa"] {
            fs::write(src.join(name), name).unwrap();
        }
        let dest = dir.path().join("root/.ssh");
        let mut artifact = inline("root-ssh", "", &dest);
        artifact.source = Source::Tree {
            path: src,
            secret: true,
        };
        artifact.privilege = Privilege::Elevated;
        artifact.mode = 0o700;

        let result = Applier::new(&ctx).apply(&artifact);
        assert!(matches!(result, ApplyResult::Applied { backup: None }), "{result:?}");
        assert_eq!(
            elevator.calls(),
            vec![
                format!("copy {}", dest.display()),
                format!("chmod {}", dest.display()),
                format!("chmod {}", dest.join("config").display()),
                format!("chmod {}", dest.join("id_rsa").display()),
                format!("chmod {}", dest.join("id_rsa.pub").display()),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_destination_tree_keeps_its_old_content_in_the_backup() {
        let (ctx, _log, dir, _guard) = setup(true);
        let real = dir.path().join("win-ssh");
        fs::create_dir_all(&real).unwrap();
        fs::write(real.join("config"), "OLD").unwrap();
        let dest = dir.path().join(".ssh");
        std::os::unix::fs::symlink(&real, &dest).unwrap();

        let src = dir.path().join("ssh-src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("config"), "NEW").unwrap();
        let mut artifact = inline("ssh", "", &dest);
        artifact.source = Source::Tree {
            path: src,
            secret: true,
        };
        artifact.mode = 0o700;

        let result = Applier::new(&ctx).apply(&artifact);
        let backup = match &result {
            ApplyResult::Applied { backup } => backup.clone(),
            _ => None,
        }
        .expect("applied with a backup");
        assert!(!fs::symlink_metadata(&backup).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(backup.join("config")).unwrap(), "OLD");
        assert_eq!(fs::read_to_string(real.join("config")).unwrap(), "NEW");
    }

    #[test]
    fn unusable_timestamp_format_fails_only_that_artifact() {
        let (log, dir, _guard) = isolated_run_log();
        let log = Arc::new(log);
        let ctx = Context {
            backups: BackupManager::new(true, "backup", "%Q"),
            ..context(
                Arc::clone(&log),
                Arc::new(DenyingElevator::PermissionDenied),
                true,
            )
        };
        let existing = dir.path().join("wsl.conf");
        fs::write(&existing, "A=1").unwrap();
        let fresh = dir.path().join("aliases");

        let results = Applier::new(&ctx).run(&[
            inline("wsl.conf", "B=2", &existing),
            inline("aliases", "alias ll='ls -l'", &fresh),
        ]);

        assert!(matches!(
            results[0].1,
            ApplyResult::Failed(ApplyError::BackupFailed { .. })
        ));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "A=1");
        assert!(matches!(results[1].1, ApplyResult::Applied { backup: None }));
    }

    #[test]
    fn owner_is_applied_through_the_elevator() {
        let (log, dir, _guard) = isolated_run_log();
        let elevator = Arc::new(RecordingElevator::default());
        let ctx = context(
            Arc::new(log),
            Arc::clone(&elevator) as Arc<dyn ElevatedWriter>,
            true,
        );
        let dest = dir.path().join("mount-vhd.sh");
        let mut artifact = inline("mount", "#!/bin/sh\n", &dest);
        artifact.owner = Some("root:root".to_string());

        Applier::new(&ctx).apply(&artifact);
        assert_eq!(
            elevator.calls(),
            vec![format!("chown root:root {}", dest.display())]
        );
    }

    #[test]
    fn append_missing_lines_cases() {
        assert_eq!(append_missing_lines("a\nb\n", "b\na"), None);
        assert_eq!(
            append_missing_lines("a", "a\nc"),
            Some("a\nc\n".to_string())
        );
        assert_eq!(append_missing_lines("", "x\n\nx\n"), Some("x\n".to_string()));
        assert_eq!(append_missing_lines("a  \n", "a"), None);
    }

    #[test]
    fn error_chain_includes_causes() {
        let e = ApplyError::PermissionDenied {
            path: PathBuf::from("/etc/x.backup.1"),
        }
        .into_backup_failure(Path::new("/etc/x"));
        assert_eq!(
            error_chain(&e),
            "backup of /etc/x failed: permission denied: /etc/x.backup.1"
        );
    }
}
