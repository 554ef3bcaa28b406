//! Logging setup.
//!
//! Writes to a log file (truncated at startup) and to stdout. The level
//! defaults to `info` and can be overridden with `RUST_LOG`, for example
//! `RUST_LOG=prayermap_geo::gateway=debug`.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive.
///
/// Dropping the guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Installs the global subscriber.
///
/// Creates `log_dir` if needed and clears `log_file` from the previous run.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written, or if a
/// global subscriber is already installed.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // init_logging installs a process-wide subscriber, so it is exercised
    // once here and every later call must fail cleanly.
    #[test]
    fn test_init_logging_truncates_file_and_rejects_second_init() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        fs::create_dir_all(&log_dir).unwrap();
        fs::write(log_dir.join("geo.log"), "previous session").unwrap();

        let first = init_logging(&log_dir, "geo.log");
        assert_eq!(fs::read_to_string(log_dir.join("geo.log")).unwrap(), "");

        if first.is_ok() {
            let second = init_logging(&log_dir, "geo.log");
            assert_eq!(second.err().unwrap().kind(), io::ErrorKind::AlreadyExists);
        }
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        assert!(init_logging(&blocker.join("logs"), "geo.log").is_err());
    }
}
