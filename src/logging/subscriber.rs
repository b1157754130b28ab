//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context as _, Result};

use super::types::{RunLogEntry, STAGE_TARGET, SUCCESS_TARGET, Severity};
use super::utils::{format_local_datetime, strip_ansi};

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// A [`tracing_subscriber::Layer`] that appends every event to the run log
/// with a timestamp and ANSI codes stripped.
///
/// The file is truncated when the layer is created, so each run starts a
/// fresh log.  Writes are unbuffered: each event reaches the file before
/// the logging call returns.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Create (or truncate) the log at `path`, write a run header, and
    /// return a layer ready to receive events.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file cannot be opened.
    pub(super) fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let version = crate::commands::version::version();
        let header = format!(
            "==========================================\n\
             wsl-setup {version} {}\n\
             ==========================================\n",
            format_local_datetime(),
        );
        fs::write(path, header)?;
        let file = fs::OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

/// Map a tracing level/target pair to a run-log severity.
///
/// Returns `None` for events that are not durable entries of their own
/// (stage headers and debug output, which get their own line shapes).
fn severity_of(level: tracing::Level, target: &str) -> Option<Severity> {
    match level {
        tracing::Level::ERROR => Some(Severity::Error),
        tracing::Level::WARN => Some(Severity::Warn),
        tracing::Level::INFO if target == STAGE_TARGET => None,
        tracing::Level::INFO if target == SUCCESS_TARGET => Some(Severity::Success),
        tracing::Level::INFO => Some(Severity::Info),
        _ => None,
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let message = strip_ansi(&extractor.message);
        let timestamp = format_local_datetime();

        let line = match severity_of(level, target) {
            Some(severity) => RunLogEntry {
                timestamp,
                severity,
                message,
            }
            .to_string(),
            None if target == STAGE_TARGET => format!("[{timestamp}] ==> {message}"),
            None => format!("[{timestamp}] [debug] {message}"),
        };

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits marker-prefixed
/// console output.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = &extractor.message;

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31m✗ ERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33m! WARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == STAGE_TARGET => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO if target == SUCCESS_TARGET => {
                writeln!(writer, "  \x1b[32m✓\x1b[0m {msg}")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Build a dispatcher that only writes to the run log at `log_path`.
///
/// Used for scoped logging (e.g. with [`tracing::dispatcher::set_default`])
/// where console output is not wanted.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn file_dispatch(log_path: &Path) -> Result<tracing::Dispatch> {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let file_layer = FileLayer::create(log_path)
        .with_context(|| format!("opening run log {}", log_path.display()))?;
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    Ok(tracing::Dispatch::new(subscriber))
}

/// Initialise the global [`tracing`] subscriber.
///
/// Sets up a console layer (warn and error to stderr, everything else to
/// stdout) and, when `log_path` is given, a file layer that writes all
/// events, including `debug`, to the run log.  The console level defaults
/// to `info` (`debug` when `verbose`) and can be overridden with
/// `WSL_SETUP_LOG`.
///
/// Must be called once at program startup, before any logging.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened; no operation can be
/// recorded, so the run must not start.
pub fn init_subscriber(verbose: bool, log_path: Option<&Path>) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_filter = EnvFilter::try_from_env("WSL_SETUP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(make_writer)
        .with_filter(console_filter);

    let file_layer = log_path
        .map(|path| {
            FileLayer::create(path)
                .with_context(|| format!("opening run log {}", path.display()))
        })
        .transpose()?
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("installing the tracing subscriber")?;
    Ok(())
}
