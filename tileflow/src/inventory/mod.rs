//! Project input ingestion: locating, parsing, and snapshotting tile
//! inventories.
//!
//! An *inventory* is the externally produced document enumerating the tiles
//! that currently exist for a project. Two formats are accepted:
//!
//! - the pipeline format (`pipeline-input.json`), preferred;
//! - the legacy dashboard format (`dashboard.json`).
//!
//! Dispatch between them is by content, not filename: a document carrying a
//! `pipelineFormat` field is parsed as pipeline format, anything else as
//! dashboard format. After every successful parse the canonical tile vector
//! is persisted to `pipeline-storage.json`, rotating the previous snapshot to
//! `pipeline-storage.json.last`.

mod document;
mod reader;
mod snapshot;

pub use document::{InventoryDocument, TileGroup};
pub use reader::{
    classify_root, load_inventory, Classification, InventoryError, InventorySource,
    DASHBOARD_FILE, PIPELINE_INPUT_FILE,
};
pub use snapshot::{
    read_snapshot, write_snapshot, SnapshotError, SNAPSHOT_BACKUP_FILE, SNAPSHOT_FILE,
};
