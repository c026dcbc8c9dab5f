//! The per-project ingestor worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::control::{ControlPlane, ControlPlaneError};
use crate::hub::StageScheduler;
use crate::inventory::{classify_root, load_inventory, write_snapshot, SnapshotError};
use crate::model::{CanonicalTile, InputSourceState, Project, ProjectId, TaskExecutionRecord};
use crate::mux::{MuxOutcome, TileMuxer, MASS_DELETION_GUARD};
use crate::pathmap::PathMap;
use crate::store::{StorageManager, StoreError};

/// Ingestor tuning.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Cadence of ingest ticks.
    pub interval: Duration,
    /// Mass-deletion guard threshold passed to the muxer.
    pub guard_threshold: usize,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            guard_threshold: MASS_DELETION_GUARD,
        }
    }
}

/// How one ingest tick resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A plan was computed and applied; the snapshot was rewritten.
    Applied {
        inserted: usize,
        updated: usize,
        deleted: usize,
    },
    /// No inventory document to read (missing root or missing file).
    SkippedNoInput(InputSourceState),
    /// The selected document could not be read or parsed.
    SkippedParse,
    /// The mass-deletion guard refused the pass; nothing was touched.
    GuardTripped,
}

/// Errors that fail a tick; the loop retries on the next tick.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Periodic inventory-synchronization worker for one project.
///
/// The worker is the stage-zero scheduler of its project's pipeline: its
/// stage status derives purely from the inventory, so completion records are
/// a no-op for it, and its real work happens in [`refresh_tile_status`].
///
/// [`refresh_tile_status`]: ProjectIngestor::refresh_tile_status
pub struct ProjectIngestor {
    project: Project,
    stage_id: String,
    /// Project root after remote→local path mapping.
    local_root: PathBuf,
    muxer: TileMuxer,
    storage: Arc<dyn StorageManager>,
    control: Arc<dyn ControlPlane>,
    interval: Duration,
}

impl ProjectIngestor {
    pub fn new(
        project: Project,
        path_map: &PathMap,
        clock: Arc<dyn Clock>,
        storage: Arc<dyn StorageManager>,
        control: Arc<dyn ControlPlane>,
        config: IngestorConfig,
    ) -> Self {
        let local_root = PathBuf::from(path_map.map(&project.root_path));
        let stage_id = format!("{}/stage-0", project.id);
        let muxer = TileMuxer::new(clock).with_guard_threshold(config.guard_threshold);
        Self {
            project,
            stage_id,
            local_root,
            muxer,
            storage,
            control,
            interval: config.interval,
        }
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project.id
    }

    /// Runs ticks at the configured cadence until `exit` fires.
    ///
    /// The first tick runs immediately. An in-flight tick always completes
    /// before the worker observes the exit flag, so teardown lands on a tick
    /// boundary.
    pub async fn run(self: Arc<Self>, exit: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(project = %self.project.id, root = %self.local_root.display(),
              "project ingestor started");

        loop {
            tokio::select! {
                _ = exit.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.refresh_tile_status().await {
                Ok(outcome) => {
                    debug!(project = %self.project.id, ?outcome, "ingest tick finished")
                }
                Err(error) => {
                    warn!(project = %self.project.id, %error,
                          "ingest tick failed; will retry next tick")
                }
            }
        }

        info!(project = %self.project.id, "project ingestor stopped");
    }

    /// One full ingest pass.
    ///
    /// Classifies the root, publishes the classification, parses the
    /// selected inventory, persists any declared extent, then muxes and
    /// applies. Parse failures and guard trips skip the pass without touching
    /// the table or the snapshot.
    pub async fn refresh_tile_status(&self) -> Result<TickOutcome, IngestError> {
        let classification = classify_root(&self.local_root);
        self.control
            .update_project(&self.project.id, classification.state)
            .await?;

        let source = match classification.source {
            Some(source) => source,
            None => {
                debug!(project = %self.project.id, state = %classification.state,
                       "no inventory input");
                return Ok(TickOutcome::SkippedNoInput(classification.state));
            }
        };

        let document = match load_inventory(&source) {
            Ok(document) => document,
            Err(error) => {
                warn!(project = %self.project.id, %error,
                      "inventory unreadable; skipping pass");
                return Ok(TickOutcome::SkippedParse);
            }
        };

        if let Some(extent) = document.extents() {
            self.storage
                .save_sample_extent(&self.project.id, &extent)
                .await?;
        }

        self.mux_input_output_tiles(document.into_tiles()).await
    }

    /// Muxes parsed tiles against the persisted table and applies the plan:
    /// inserts, then updates, then deletes, one transactional bucket each,
    /// then rewrites the snapshot.
    pub async fn mux_input_output_tiles(
        &self,
        tiles: Vec<CanonicalTile>,
    ) -> Result<TickOutcome, IngestError> {
        let persisted = self.storage.stage_tiles(&self.project.id).await?;

        let plan = match self.muxer.mux(&tiles, &persisted) {
            MuxOutcome::Plan(plan) => plan,
            MuxOutcome::GuardTripped { .. } => return Ok(TickOutcome::GuardTripped),
        };

        if !plan.to_insert.is_empty() {
            self.storage
                .insert_tiles(&self.project.id, &plan.to_insert)
                .await?;
        }
        if !plan.to_update.is_empty() {
            self.storage
                .update_tiles(&self.project.id, &plan.to_update)
                .await?;
        }
        if !plan.to_delete.is_empty() {
            self.storage
                .delete_tiles(&self.project.id, &plan.to_delete)
                .await?;
        }

        write_snapshot(&self.local_root, &tiles)?;

        Ok(TickOutcome::Applied {
            inserted: plan.to_insert.len(),
            updated: plan.to_update.len(),
            deleted: plan.to_delete.len(),
        })
    }
}

#[async_trait]
impl StageScheduler for ProjectIngestor {
    fn stage_id(&self) -> &str {
        &self.stage_id
    }

    /// Stage zero runs no external tasks; a stray completion record is
    /// consumed so the broker does not redeliver it forever.
    async fn on_task_execution_complete(&self, record: &TaskExecutionRecord) -> bool {
        debug!(project = %self.project.id, execution = %record.id,
               "ignoring completion record addressed to the inventory stage");
        true
    }
}
