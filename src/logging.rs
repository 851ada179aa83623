//! Logging for `crime-risk train` and `crime-risk predict`.
//!
//! Each invocation gets its own file under `<app dir>/logs`, named after the
//! command and the local start time, e.g.
//! `crime-risk_predict_2024-05-01_09-30-00.log`, so `predict` runs driven by
//! another process are easy to tell apart from training runs. Only the newest
//! [`MAX_LOG_FILES`] files are kept.
//!
//! Events also go to stderr. Stdout is never written here: `train` prints its
//! report there and `predict` answers with exactly one JSON line that callers
//! parse.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Maximum number of log files to retain, across both commands.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "crime-risk";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Reasons logging could not be started. None of them stop the command; the
/// binary reports the error on stderr and runs without a log file.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Neither `CRIME_RISK_CONFIG_HOME` nor an OS config directory is available.
    #[error("No config directory available for crime-risk logs")]
    NoBaseDir,
    /// Failed to create or access `<app dir>/logs`.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to list earlier runs' log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to format a timestamp for the log filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    /// Failed to create this run's log file.
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Start logging for one `command` run (`"train"` or `"predict"`).
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Subsequent calls
/// are no-ops.
pub fn init(command: &str) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let log_dir = log_directory()?;
    let log_file_name = format_log_file_name(command, now_local_or_utc())?;
    let log_path = log_dir.join(&log_file_name);
    ensure_file_exists(&log_path)?;

    let file_appender = rolling::never(&log_dir, log_file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    prune_old_logs(&log_dir, MAX_LOG_FILES)?;

    let timer = build_timer();
    let env_filter = build_env_filter();
    let stderr_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stderr);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);
    tracing::debug!(command, path = %log_path.display(), "Logging initialized");
    Ok(())
}

fn log_directory() -> Result<PathBuf, LoggingError> {
    app_dirs::logs_dir().map_err(map_app_dir_error)
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn format_log_file_name(command: &str, now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{command}_{stamp}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> LoggingError {
    match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoBaseDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    }
}
