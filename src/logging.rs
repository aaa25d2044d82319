use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where the persistent log goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// A single file, appended to and never rotated
    File(Utf8PathBuf),
    /// Daily rotating files `<prefix>.<date>` in `dir`
    Daily { dir: Utf8PathBuf, prefix: String },
}

impl LogDestination {
    /// Directory that must exist before the appender is created
    pub fn directory(&self) -> &Utf8Path {
        match self {
            LogDestination::File(path) => path
                .parent()
                .filter(|p| !p.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new(".")),
            LogDestination::Daily { dir, .. } => dir,
        }
    }

    /// The log file itself, or the directory holding the daily files
    pub fn path(&self) -> &Utf8Path {
        match self {
            LogDestination::File(path) => path,
            LogDestination::Daily { dir, .. } => dir,
        }
    }

    fn appender(&self) -> Result<rolling::RollingFileAppender> {
        let dir = self.directory();
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir))?;
        }

        Ok(match self {
            LogDestination::File(path) => {
                let file_name = path
                    .file_name()
                    .with_context(|| format!("Log file path has no file name: {}", path))?;
                rolling::never(dir, file_name)
            }
            LogDestination::Daily { dir, prefix } => rolling::daily(dir, prefix),
        })
    }
}

/// `RUST_LOG` when set, otherwise info (or debug in debug mode)
fn env_filter(debug_mode: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Setup logging to the given destination only.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(destination: &LogDestination, debug_mode: bool) -> Result<WorkerGuard> {
    setup_logging_with_console(destination, debug_mode, false)
}

/// Setup file logging plus optional ANSI console output.
///
/// # Arguments
/// * `destination` - Persistent log file or daily log directory
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to the console
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging_with_console(
    destination: &LogDestination,
    debug_mode: bool,
    console_output: bool,
) -> Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(destination.appender()?);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(debug_mode))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install the global log subscriber")?;

    tracing::info!(
        "Logging initialized: destination={:?}, debug={}, console={}",
        destination,
        debug_mode,
        console_output
    );

    Ok(guard)
}
