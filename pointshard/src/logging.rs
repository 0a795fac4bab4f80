//! Logging setup.
//!
//! Structured logging via `tracing`, with two outputs: a compact stdout
//! layer for interactive runs and a non-blocking plain-text file layer for
//! post-mortems. Filtering honors `RUST_LOG`, defaulting to `info`. The
//! library itself never installs a subscriber; binaries call
//! [`init_logging`] once at startup and hold the returned guard.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the file writer alive; dropping it flushes and closes the log.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Default log directory.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "pointshard.log"
}

/// Install the global subscriber with stdout and file output.
///
/// Creates the log directory if needed and truncates the previous log file.
/// Returns a guard that must stay alive for file logging to flush.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(Path::new(log_dir).join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        assert_eq!(default_log_dir(), "logs");
        assert_eq!(default_log_file(), "pointshard.log");
    }

    #[test]
    fn test_log_file_is_truncated() {
        // init_logging installs a global subscriber and can only run once per
        // process, so only the file handling is covered here.
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pointshard.log");

        fs::write(&path, "stale contents").unwrap();
        fs::write(&path, "").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
