//! Command: apply the configured artifacts.
use std::sync::Arc;

use anyhow::Result;

use crate::applier::{Applier, Context};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::config::Policy;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, RunLog, default_log_path, init_subscriber};

use super::{CommandSetup, filter_artifacts, unknown_identities, version};

/// Run the apply command.
///
/// The run log is opened before anything else is logged; if it cannot be
/// opened the command fails without touching any artifact.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the run log
/// cannot be opened, or any artifact failed.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, verbose: bool) -> Result<()> {
    let setup = CommandSetup::load(global)?;
    let log_path = setup
        .config
        .policy
        .log_file
        .clone()
        .unwrap_or_else(default_log_path);
    init_subscriber(verbose, Some(&log_path))?;

    let log = Arc::new(RunLog::new(Some(&log_path)));
    execute(&setup, opts, &log, Arc::new(SystemExecutor))
}

/// Apply the selected artifacts, print the summary, and bail if any failed.
///
/// # Errors
///
/// Returns an error if one or more artifacts recorded a failure.
pub fn execute(
    setup: &CommandSetup,
    opts: &ApplyOpts,
    log: &Arc<RunLog>,
    executor: Arc<dyn Executor>,
) -> Result<()> {
    log.info(&format!("wsl-setup {}", version::version()));
    setup.report(log.as_ref());

    for name in unknown_identities(&setup.config.artifacts, &opts.only)
        .into_iter()
        .chain(unknown_identities(&setup.config.artifacts, &opts.skip))
    {
        log.warn(&format!("no artifact named '{name}'"));
    }

    let policy = Policy {
        backups_enabled: setup.config.policy.backups_enabled && !opts.no_backup,
        ..setup.config.policy.clone()
    };
    if !policy.backups_enabled {
        log.info("backups disabled");
    }

    let ctx = Context::new(
        &policy,
        setup.platform.clone(),
        Arc::clone(log) as Arc<dyn Log>,
        executor,
    );
    let artifacts = filter_artifacts(&setup.config.artifacts, &opts.only, &opts.skip);
    Applier::new(&ctx).run(&artifacts);

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} artifact(s) failed");
    }
    Ok(())
}
