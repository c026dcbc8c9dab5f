//! Scheduler hub: routing completion records to per-stage schedulers.
//!
//! Stage schedulers register themselves as the control plane brings stages
//! online. A completion record for a stage with no registered scheduler is
//! reported unhandled, which makes the dispatcher retry later rather than
//! lose the record.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::model::TaskExecutionRecord;

/// One stage's scheduler, as seen by the hub.
///
/// The inventory-synchronization stage (stage zero) is one implementor among
/// the per-stage task schedulers; later stages are registered by the
/// surrounding infrastructure.
#[async_trait]
pub trait StageScheduler: Send + Sync {
    /// The pipeline stage this scheduler owns.
    fn stage_id(&self) -> &str;

    /// Applies one completion record. Returns `true` once the record is
    /// durably handled; `false` asks the caller to retry later.
    async fn on_task_execution_complete(&self, record: &TaskExecutionRecord) -> bool;
}

/// Registry facade over the per-stage schedulers.
#[derive(Default)]
pub struct SchedulerHub {
    schedulers: DashMap<String, Arc<dyn StageScheduler>>,
}

impl SchedulerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the scheduler owning its stage id.
    pub fn register(&self, scheduler: Arc<dyn StageScheduler>) {
        self.schedulers
            .insert(scheduler.stage_id().to_string(), scheduler);
    }

    /// Removes a stage's scheduler; subsequent records for it go unhandled.
    pub fn deregister(&self, stage_id: &str) {
        self.schedulers.remove(stage_id);
    }

    pub fn len(&self) -> usize {
        self.schedulers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedulers.is_empty()
    }

    /// Routes a record to the scheduler owning `record.pipeline_stage_id`.
    ///
    /// `false` when no scheduler is registered for that stage yet.
    pub async fn on_task_execution_complete(&self, record: &TaskExecutionRecord) -> bool {
        let scheduler = match self.schedulers.get(&record.pipeline_stage_id) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                debug!(
                    stage = %record.pipeline_stage_id,
                    execution = %record.id,
                    "no scheduler registered for stage"
                );
                return false;
            }
        };
        scheduler.on_task_execution_complete(record).await
    }
}
