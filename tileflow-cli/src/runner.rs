//! CLI runner for common setup.
//!
//! Encapsulates config loading and logging initialization so command
//! handlers share one bootstrap path.

use std::path::Path;

use tracing::info;

use crate::error::CliError;
use tileflow::config::{load, load_from, Settings};
use tileflow::logging::{init_logging_full, LoggingGuard};

/// Manages CLI lifecycle: configuration plus the logging guard.
pub struct CliRunner {
    /// Keeps the non-blocking log writer alive for the process lifetime.
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    settings: Settings,
}

impl CliRunner {
    /// Loads settings (from `config_path` when given) and initializes
    /// logging to the configured file plus stdout.
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let settings = match config_path {
            Some(path) => load_from(path)?,
            None => load()?,
        };

        let log_path = &settings.logging.file;
        let log_dir = log_path
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let log_file = log_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "tileflow.log".to_string());

        let logging_guard = init_logging_full(&log_dir, &log_file, true, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tileflow v{}", tileflow::VERSION);
        info!("tileflow CLI: {} command", command);
    }
}
