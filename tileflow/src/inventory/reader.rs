//! Inventory location and loading.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::document::InventoryDocument;
use crate::model::InputSourceState;

/// Preferred inventory document name.
pub const PIPELINE_INPUT_FILE: &str = "pipeline-input.json";

/// Legacy inventory document name.
pub const DASHBOARD_FILE: &str = "dashboard.json";

/// Errors loading an inventory document.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse inventory {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The inventory document selected for a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventorySource {
    Pipeline(PathBuf),
    Dashboard(PathBuf),
}

impl InventorySource {
    pub fn path(&self) -> &Path {
        match self {
            InventorySource::Pipeline(p) | InventorySource::Dashboard(p) => p,
        }
    }
}

/// Result of classifying a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: InputSourceState,
    pub source: Option<InventorySource>,
}

/// Classifies a (path-mapped) project root.
///
/// Order of precedence: missing root, `pipeline-input.json`, `dashboard.json`,
/// then nothing found. States with no source yield an empty inventory.
pub fn classify_root(root: &Path) -> Classification {
    if !root.is_dir() {
        return Classification {
            state: InputSourceState::BadLocation,
            source: None,
        };
    }

    let pipeline = root.join(PIPELINE_INPUT_FILE);
    if pipeline.is_file() {
        return Classification {
            state: InputSourceState::Pipeline,
            source: Some(InventorySource::Pipeline(pipeline)),
        };
    }

    let dashboard = root.join(DASHBOARD_FILE);
    if dashboard.is_file() {
        return Classification {
            state: InputSourceState::Dashboard,
            source: Some(InventorySource::Dashboard(dashboard)),
        };
    }

    Classification {
        state: InputSourceState::Missing,
        source: None,
    }
}

/// Reads and parses the selected inventory document.
///
/// Parsing dispatches on content (the `pipelineFormat` sentinel), not on
/// which filename was selected.
pub fn load_inventory(source: &InventorySource) -> Result<InventoryDocument, InventoryError> {
    let path = source.path();
    let text = fs::read_to_string(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    InventoryDocument::parse(&text).map_err(|source| InventoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
