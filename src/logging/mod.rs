//! Console and `sync.log` output.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::application::data::LogLevel;

pub const LOG_FILE_NAME: &str = "sync.log";

/// Keeps the background log writer alive; dropping it flushes `sync.log`.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Installs a console layer and an append-mode file layer writing to
/// `<log_dir>/sync.log`, both filtered at `level`.
pub fn setup_tracing(log_dir: &Path, level: &LogLevel) -> Result<LogGuard, LoggingSetupError> {
    let file_appender = open_log_file(log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = tracing_subscriber::fmt::layer().compact().with_target(true);

    tracing_subscriber::registry()
        .with(level.to_level_filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context(SubscriberSnafu)?;

    Ok(LogGuard { _guard: guard })
}

fn open_log_file(log_dir: &Path) -> Result<RollingFileAppender, LoggingSetupError> {
    fs::create_dir_all(log_dir).context(LogDirectorySnafu { path: log_dir })?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)
        .context(LogFileSnafu {
            path: log_dir.join(LOG_FILE_NAME),
        })
}

#[derive(Debug, Snafu)]
pub enum LoggingSetupError {
    #[snafu(display("Failed to create log directory {}", path.display()))]
    LogDirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to open log file {}", path.display()))]
    LogFileError { path: PathBuf, source: InitError },
    #[snafu(display("Failed to install the log subscriber"))]
    SubscriberError {
        source: tracing_subscriber::util::TryInitError,
    },
}
