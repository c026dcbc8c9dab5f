//! Config file location, loading, and bootstrap.

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::parser::parse_ini;
use super::settings::Settings;

/// Errors loading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("invalid value for [{section}] {key} = \"{value}\": {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `~/.tileflow`, falling back to the working directory when no home
/// directory can be resolved.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tileflow")
}

/// Full path of the config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Loads settings from the default location; a missing file yields defaults.
pub fn load() -> Result<Settings, ConfigFileError> {
    load_from(&config_file_path())
}

/// Loads settings from `path`; a missing file yields defaults.
pub fn load_from(path: &Path) -> Result<Settings, ConfigFileError> {
    if !path.is_file() {
        return Ok(Settings::default());
    }
    let ini = Ini::load_from_file(path).map_err(|e| ConfigFileError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_ini(&ini)
}

/// Template written by `ensure_exists`; every key at its default, commented.
pub fn default_config_body() -> String {
    "\
# tileflow configuration

[ingest]
# Seconds between inventory ingest ticks per project.
interval = 60
# Refuse an ingest pass that would delete more than this many tiles.
mass_deletion_guard = 1000

[broker]
queue = TaskExecutionUpdateQueue
prefetch = 50
reconnect_initial = 5
reconnect_cap = 60

[logging]
# file = /var/log/tileflow/tileflow.log

# Ordered remote -> local mount rewrites; first match wins.
[path_mapping]
# /nrs/mouselight = /mnt/nrs
"
    .to_string()
}

/// Writes the default config file if none exists; returns its path.
pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
    let path = config_file_path();
    if path.is_file() {
        return Ok(path);
    }
    let dir = config_directory();
    fs::create_dir_all(&dir).map_err(|source| ConfigFileError::Write {
        path: dir.clone(),
        source,
    })?;
    fs::write(&path, default_config_body()).map_err(|source| ConfigFileError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
