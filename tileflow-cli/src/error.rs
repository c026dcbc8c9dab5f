//! Centralized CLI error handling.

use thiserror::Error;

use tileflow::config::ConfigFileError;

/// Errors surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("failed to start async runtime: {0}")]
    Runtime(String),
}
