//! Configuration for the scheduling core.
//!
//! Settings live in an INI file at `~/.tileflow/config.ini` and map onto
//! plain structs with defaults, so a missing file or section simply yields
//! the default behavior. The `[path_mapping]` section is ordered: pairs are
//! tried top to bottom and the first matching prefix wins.
//!
//! ```ini
//! [ingest]
//! interval = 60
//! mass_deletion_guard = 1000
//!
//! [broker]
//! queue = TaskExecutionUpdateQueue
//! prefetch = 50
//!
//! [path_mapping]
//! /nrs/mouselight = /mnt/nrs
//! ```

mod file;
mod parser;
mod settings;

pub use file::{
    config_directory, config_file_path, default_config_body, ensure_exists, load, load_from,
    ConfigFileError,
};
pub use settings::{BrokerSettings, IngestSettings, LoggingSettings, Settings};
