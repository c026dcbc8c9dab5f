//! Keyed table-store seam.
//!
//! The real deployment persists tile-status rows in a relational database
//! behind the surrounding infrastructure's ORM; this core views it abstractly
//! as a keyed table store per project. Bucket operations are atomic: a failed
//! insert/update/delete call leaves that bucket unapplied as a whole.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ProjectId, SampleExtent, TileStatusRow};

/// Errors from the table store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("duplicate tile key {relative_path} in project {project}")]
    DuplicateKey {
        project: ProjectId,
        relative_path: String,
    },
}

/// Abstract per-project tile table plus project-extent persistence.
///
/// Rows are keyed by `relative_path` (unique within a project) and returned
/// in insertion order, which the muxer uses as the delete-bucket ordering.
#[async_trait]
pub trait StorageManager: Send + Sync {
    /// All persisted stage-zero rows for a project, in insertion order.
    async fn stage_tiles(&self, project: &ProjectId) -> Result<Vec<TileStatusRow>, StoreError>;

    /// Inserts new rows; the whole bucket succeeds or fails together.
    async fn insert_tiles(
        &self,
        project: &ProjectId,
        rows: &[TileStatusRow],
    ) -> Result<(), StoreError>;

    /// Rewrites existing rows matched by `relative_path`.
    async fn update_tiles(
        &self,
        project: &ProjectId,
        rows: &[TileStatusRow],
    ) -> Result<(), StoreError>;

    /// Removes rows by `relative_path`; absent keys are ignored.
    async fn delete_tiles(
        &self,
        project: &ProjectId,
        relative_paths: &[String],
    ) -> Result<(), StoreError>;

    /// Persists the project's sample extent ahead of tile processing.
    async fn save_sample_extent(
        &self,
        project: &ProjectId,
        extent: &SampleExtent,
    ) -> Result<(), StoreError>;
}
