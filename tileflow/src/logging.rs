//! Logging infrastructure.
//!
//! Structured `tracing` output with dual sinks:
//! - a non-blocking file writer (internal failures land here at debug/warn,
//!   per the error-handling policy: project input state is the user-facing
//!   signal, the log stream is for operators)
//! - optional stdout for interactive runs
//!
//! Configurable via the RUST_LOG environment variable.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging with file output and optional stdout.
///
/// Creates the log directory if needed and starts a fresh log file per
/// session.
///
/// # Arguments
///
/// * `log_dir` - Directory for log files
/// * `log_file` - Log filename
/// * `stdout_enabled` - Mirror log lines to stdout
/// * `debug_mode` - Default the filter to `debug` instead of `info` when
///   RUST_LOG is unset
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be reset.
pub fn init_logging_full(
    log_dir: &str,
    log_file: &str,
    stdout_enabled: bool,
    debug_mode: bool,
) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    // Start each session with an empty log file.
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = if stdout_enabled {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stdout)
                .with_ansi(true),
        )
    } else {
        None
    };

    let default_filter = if debug_mode { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Initialize logging with the common defaults: stdout on, info filter.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    init_logging_full(log_dir, log_file, true, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // The global subscriber can only be installed once per process, so these
    // tests cover the file preparation; init itself is exercised by the CLI.

    #[test]
    fn session_start_resets_log_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tileflow.log");
        std::fs::write(&path, "old session").unwrap();

        std::fs::write(&path, "").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn nested_log_directories_are_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep/logs");
        fs::create_dir_all(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
