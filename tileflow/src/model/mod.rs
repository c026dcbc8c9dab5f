//! Core data model for the scheduling core.
//!
//! Three families of types live here:
//!
//! - Project-level: [`Project`], [`ProjectId`], [`SampleExtent`], and the
//!   [`InputSourceState`] classification produced by each ingestor pass.
//! - Tile-level: [`StageStatus`], the canonical [`CanonicalTile`] parsed from
//!   an inventory document, and the persisted [`TileStatusRow`].
//! - Execution-level: [`TaskExecutionRecord`], the completion report a worker
//!   publishes for one (stage, tile) pair.

mod execution;
mod project;
mod tile;

pub use execution::{decode_task_execution, TaskExecutionRecord};
pub use project::{InputSourceState, Project, ProjectId, SampleExtent};
pub use tile::{normalize_relative_path, CanonicalTile, StageStatus, TileStatusRow};
