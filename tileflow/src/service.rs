//! High-level service facade.
//!
//! Wires the injected collaborators (table store, control plane, metrics
//! sink, broker, clock) into a running system: one completion-intake consumer
//! plus an ingestor worker per registered project. Stage-zero ingestors are
//! registered with the scheduler hub so completion records addressed to the
//! inventory stage are absorbed; later-stage schedulers register through
//! [`TileflowService::hub`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broker::MessageSource;
use crate::clock::Clock;
use crate::config::Settings;
use crate::control::ControlPlane;
use crate::hub::{SchedulerHub, StageScheduler};
use crate::ingest::{IngestorPool, ProjectIngestor};
use crate::intake::{CompletionDispatcher, CompletionIntake};
use crate::model::{Project, ProjectId};
use crate::pathmap::PathMap;
use crate::sink::MetricsSink;
use crate::store::StorageManager;

/// The assembled scheduling core.
///
/// Must be created inside a tokio runtime; the completion-intake consumer is
/// spawned immediately, ingestors as projects are added.
pub struct TileflowService {
    settings: Settings,
    path_map: PathMap,
    clock: Arc<dyn Clock>,
    storage: Arc<dyn StorageManager>,
    control: Arc<dyn ControlPlane>,
    hub: Arc<SchedulerHub>,
    pool: IngestorPool,
    intake: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl TileflowService {
    pub fn new(
        settings: Settings,
        storage: Arc<dyn StorageManager>,
        control: Arc<dyn ControlPlane>,
        sink: Arc<dyn MetricsSink>,
        broker: Arc<dyn MessageSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hub = Arc::new(SchedulerHub::new());
        let shutdown = CancellationToken::new();

        let dispatcher = Arc::new(CompletionDispatcher::new(sink, Arc::clone(&hub)));
        let intake = CompletionIntake::new(broker, dispatcher).with_config(settings.intake_config());
        let intake = tokio::spawn(intake.run(shutdown.child_token()));

        let path_map = settings.path_map();

        info!(version = crate::VERSION, "tileflow service starting");

        Self {
            settings,
            path_map,
            clock,
            storage,
            control,
            hub,
            pool: IngestorPool::new(),
            intake,
            shutdown,
        }
    }

    /// Starts ingesting a project and registers its stage-zero scheduler.
    pub fn add_project(&mut self, project: Project) {
        let ingestor = Arc::new(ProjectIngestor::new(
            project,
            &self.path_map,
            Arc::clone(&self.clock),
            Arc::clone(&self.storage),
            Arc::clone(&self.control),
            self.settings.ingestor_config(),
        ));
        let stage_zero: Arc<dyn StageScheduler> = ingestor.clone();
        self.hub.register(stage_zero);
        self.pool.spawn(ingestor);
    }

    /// Sets a project's exit flag; its worker stops at the next tick
    /// boundary. Returns whether the project was known.
    pub fn request_exit(&self, project: &ProjectId) -> bool {
        self.pool.request_exit(project)
    }

    /// The scheduler hub, for registering later-stage schedulers.
    pub fn hub(&self) -> Arc<SchedulerHub> {
        Arc::clone(&self.hub)
    }

    pub fn project_count(&self) -> usize {
        self.pool.len()
    }

    /// Graceful stop: ingestors finish their in-flight ticks, the consumer
    /// releases unacked deliveries back to the broker.
    pub async fn shutdown(self) {
        info!("tileflow service stopping");
        self.shutdown.cancel();
        self.pool.shutdown().await;
        let _ = self.intake.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use crate::clock::SystemClock;
    use crate::control::RecordingControlPlane;
    use crate::model::InputSourceState;
    use crate::sink::MemoryMetricsSink;
    use crate::store::MemoryStorage;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn full_service_runs_and_shuts_down() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("pipeline-input.json"),
            r#"{"pipelineFormat": 1, "tiles": [
                {"id": 1, "relativePath": "a/b.tif", "isComplete": true}
            ]}"#,
        )
        .unwrap();

        let storage = Arc::new(MemoryStorage::new());
        let control = Arc::new(RecordingControlPlane::new());
        let sink = Arc::new(MemoryMetricsSink::new());
        let broker = Arc::new(MemoryBroker::new());

        let mut settings = Settings::default();
        settings.ingest.interval_secs = 1;

        let mut service = TileflowService::new(
            settings,
            storage.clone(),
            control.clone(),
            sink.clone(),
            broker.clone(),
            Arc::new(SystemClock),
        );

        service.add_project(Project::new(
            "p-1",
            "sample",
            dir.path().to_str().unwrap(),
        ));
        assert_eq!(service.project_count(), 1);

        // Stage-zero records are absorbed through the hub.
        broker.publish(
            r#"{"id": "e1", "worker_id": "w", "tile_id": "a/b.tif",
                "pipeline_stage_id": "p-1/stage-0", "execution_status_code": 3,
                "completion_status_code": 4, "submitted_at": 0,
                "started_at": null, "completed_at": null}"#,
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while tokio::time::Instant::now() < deadline {
            if control.state_of(&ProjectId::new("p-1")) == Some(InputSourceState::Pipeline)
                && sink.written().len() == 1
                && broker.unacked() == 0
                && broker.ready_len() == 0
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            control.state_of(&ProjectId::new("p-1")),
            Some(InputSourceState::Pipeline)
        );
        assert_eq!(sink.written().len(), 1);
        assert!(dir.path().join("pipeline-storage.json").is_file());

        assert!(service.request_exit(&ProjectId::new("p-1")));
        tokio::time::timeout(Duration::from_secs(2), service.shutdown())
            .await
            .expect("shutdown must complete");
    }
}
