//! Settings structs for all configuration sections.
//!
//! Pure data with defaults; parsing lives in the sibling `parser` module.

use std::path::PathBuf;
use std::time::Duration;

use crate::broker::{DEFAULT_PREFETCH, TASK_EXECUTION_QUEUE};
use crate::ingest::IngestorConfig;
use crate::intake::IntakeConfig;
use crate::mux::MASS_DELETION_GUARD;
use crate::pathmap::{MountPair, PathMap};

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub ingest: IngestSettings,
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
    /// Ordered remote→local mount pairs for the path mapper.
    pub path_mapping: Vec<MountPair>,
}

/// `[ingest]` section.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Seconds between ingest ticks per project.
    pub interval_secs: u64,
    /// Mass-deletion guard threshold.
    pub mass_deletion_guard: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            mass_deletion_guard: MASS_DELETION_GUARD,
        }
    }
}

/// `[broker]` section.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub queue: String,
    pub prefetch: u16,
    /// First reconnect delay in seconds; doubles per failure.
    pub reconnect_initial_secs: u64,
    /// Reconnect delay cap in seconds.
    pub reconnect_cap_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            queue: TASK_EXECUTION_QUEUE.to_string(),
            prefetch: DEFAULT_PREFETCH,
            reconnect_initial_secs: 5,
            reconnect_cap_secs: 60,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: super::config_directory().join("logs").join("tileflow.log"),
        }
    }
}

impl Settings {
    /// The path mapper built from `[path_mapping]`, in file order.
    pub fn path_map(&self) -> PathMap {
        PathMap::new(self.path_mapping.clone())
    }

    pub fn ingestor_config(&self) -> IngestorConfig {
        IngestorConfig {
            interval: Duration::from_secs(self.ingest.interval_secs),
            guard_threshold: self.ingest.mass_deletion_guard,
        }
    }

    pub fn intake_config(&self) -> IntakeConfig {
        IntakeConfig {
            queue: self.broker.queue.clone(),
            prefetch: self.broker.prefetch,
            reconnect_initial: Duration::from_secs(self.broker.reconnect_initial_secs),
            reconnect_cap: Duration::from_secs(self.broker.reconnect_cap_secs),
        }
    }
}
