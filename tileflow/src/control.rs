//! Control-plane seam.
//!
//! The core publishes exactly one fact upstream: the input-source
//! classification produced by each ingestor pass. Everything else the control
//! plane knows about projects is read from the shared database by the
//! surrounding infrastructure.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{InputSourceState, ProjectId};

/// Errors publishing to the control plane.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("control plane unavailable: {0}")]
    Unavailable(String),
}

/// Upstream project-state publication.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn update_project(
        &self,
        project: &ProjectId,
        state: InputSourceState,
    ) -> Result<(), ControlPlaneError>;
}

/// Control plane that records publications; used by tests and local mode.
#[derive(Default)]
pub struct RecordingControlPlane {
    states: Mutex<HashMap<ProjectId, InputSourceState>>,
    publications: Mutex<Vec<(ProjectId, InputSourceState)>>,
}

impl RecordingControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently published state for a project.
    pub fn state_of(&self, project: &ProjectId) -> Option<InputSourceState> {
        self.states.lock().unwrap().get(project).copied()
    }

    /// Every publication in order, for assertions on publish cadence.
    pub fn publications(&self) -> Vec<(ProjectId, InputSourceState)> {
        self.publications.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlPlane for RecordingControlPlane {
    async fn update_project(
        &self,
        project: &ProjectId,
        state: InputSourceState,
    ) -> Result<(), ControlPlaneError> {
        self.states.lock().unwrap().insert(project.clone(), state);
        self.publications
            .lock()
            .unwrap()
            .push((project.clone(), state));
        Ok(())
    }
}
