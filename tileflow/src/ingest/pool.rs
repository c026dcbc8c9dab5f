//! Ownership of the per-project ingestor workers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::worker::ProjectIngestor;
use crate::model::ProjectId;

struct WorkerHandle {
    exit: CancellationToken,
    join: JoinHandle<()>,
}

/// Spawns and owns one ingestor worker per project.
///
/// Every worker's exit token is a child of the pool's token, so
/// [`shutdown`](IngestorPool::shutdown) stops everything while
/// [`request_exit`](IngestorPool::request_exit) stops one project (the
/// per-project `exit_requested` flag).
#[derive(Default)]
pub struct IngestorPool {
    workers: HashMap<ProjectId, WorkerHandle>,
    shutdown: CancellationToken,
}

impl IngestorPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Spawns a worker for the ingestor's project, replacing any previous
    /// worker for the same project (the old one is asked to exit).
    pub fn spawn(&mut self, ingestor: Arc<ProjectIngestor>) {
        let project = ingestor.project_id().clone();
        let exit = self.shutdown.child_token();
        let join = tokio::spawn(ingestor.run(exit.clone()));

        if let Some(previous) = self.workers.insert(project.clone(), WorkerHandle { exit, join }) {
            warn!(%project, "replacing existing ingestor worker");
            previous.exit.cancel();
        }
    }

    /// Sets a project's exit flag. The in-flight tick, if any, completes
    /// before the worker stops. Returns whether the project had a worker.
    pub fn request_exit(&self, project: &ProjectId) -> bool {
        match self.workers.get(project) {
            Some(handle) => {
                debug!(%project, "exit requested for project ingestor");
                handle.exit.cancel();
                true
            }
            None => false,
        }
    }

    /// Stops all workers and waits for each to reach its tick boundary.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (project, handle) in self.workers {
            if handle.join.await.is_err() {
                warn!(%project, "ingestor worker panicked before shutdown");
            }
        }
    }
}
