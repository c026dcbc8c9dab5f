//! Project identity, sample extent, and input-source classification.

use std::fmt;

/// Opaque identifier for a project.
///
/// Project IDs are assigned by the control plane; the core treats them as
/// opaque strings and only uses them as table keys and log fields.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({})", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Classification of a project's input source, produced by each ingestor pass.
///
/// This is the primary externally visible failure signal: a project whose root
/// vanished reads `BadLocation`, one whose root exists but holds no inventory
/// document reads `Missing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSourceState {
    /// No ingestor pass has classified this project yet.
    Unknown,
    /// `pipeline-input.json` present; preferred format.
    Pipeline,
    /// `dashboard.json` present; legacy format.
    Dashboard,
    /// Root exists but contains neither inventory document.
    Missing,
    /// Root directory does not exist (or is not visible after path mapping).
    BadLocation,
}

impl fmt::Display for InputSourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputSourceState::Unknown => "unknown",
            InputSourceState::Pipeline => "pipeline",
            InputSourceState::Dashboard => "dashboard",
            InputSourceState::Missing => "missing",
            InputSourceState::BadLocation => "bad-location",
        };
        write!(f, "{}", name)
    }
}

/// Axis-aligned bounds of the sample volume, in stage coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleExtent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// A project: one microscopy acquisition with a root directory holding its
/// tile lattice.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Root path as the control plane records it (remote-style; run through
    /// the path mapper before filesystem access).
    pub root_path: String,
    pub sample_extent: SampleExtent,
    pub input_source_state: InputSourceState,
}

impl Project {
    /// Creates a project with unclassified input state and zeroed extent.
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>, root_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            root_path: root_path.into(),
            sample_extent: SampleExtent::default(),
            input_source_state: InputSourceState::Unknown,
        }
    }
}
