//! Tile-level types: stage status codes, the canonical tile parsed from an
//! inventory document, and the persisted per-stage status row.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Processing status of a tile at one pipeline stage.
///
/// The numeric codes are part of the persisted schema and the snapshot file
/// format; they must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageStatus {
    Incomplete = 1,
    Queued = 2,
    Processing = 3,
    Complete = 4,
    Failed = 5,
    Canceled = 6,
}

impl StageStatus {
    /// Numeric code as persisted.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Inverse of [`code`](Self::code); `None` for unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(StageStatus::Incomplete),
            2 => Some(StageStatus::Queued),
            3 => Some(StageStatus::Processing),
            4 => Some(StageStatus::Complete),
            5 => Some(StageStatus::Failed),
            6 => Some(StageStatus::Canceled),
            _ => None,
        }
    }

    /// Stage-zero derivation: a tile the acquisition marked complete is
    /// `Complete`, anything else is `Incomplete`.
    pub fn from_is_complete(is_complete: bool) -> Self {
        if is_complete {
            StageStatus::Complete
        } else {
            StageStatus::Incomplete
        }
    }
}

impl Serialize for StageStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for StageStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        StageStatus::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown stage status code {}", code)))
    }
}

/// Replace every backslash with a forward slash.
///
/// All tile identity comparisons use the normalized form; inventories written
/// on Windows acquisition machines arrive with backslash separators.
pub fn normalize_relative_path(raw: &str) -> String {
    raw.replace('\\', "/")
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// One tile as derived from an inventory document, in snapshot form.
///
/// `relative_path` is the primary key within a project. The two status fields
/// are the stage-zero derivation from the inventory's completion flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTile {
    pub relative_path: String,
    pub index: Option<i64>,
    pub tile_name: String,
    pub prev_stage_status: StageStatus,
    pub this_stage_status: StageStatus,
    pub lat_x: Option<f64>,
    pub lat_y: Option<f64>,
    pub lat_z: Option<f64>,
    pub step_x: Option<f64>,
    pub step_y: Option<f64>,
    pub step_z: Option<f64>,
}

impl CanonicalTile {
    /// Builds a canonical tile from raw inventory fields, applying path
    /// normalization and the stage-zero status derivation.
    pub fn from_inventory(
        raw_relative_path: &str,
        index: Option<i64>,
        position: (Option<f64>, Option<f64>, Option<f64>),
        step: (Option<f64>, Option<f64>, Option<f64>),
        is_complete: bool,
    ) -> Self {
        let relative_path = normalize_relative_path(raw_relative_path);
        let tile_name = basename(&relative_path).to_string();
        let status = StageStatus::from_is_complete(is_complete);
        Self {
            relative_path,
            index,
            tile_name,
            prev_stage_status: status,
            this_stage_status: status,
            lat_x: position.0,
            lat_y: position.1,
            lat_z: position.2,
            step_x: step.0,
            step_y: step.1,
            step_z: step.2,
        }
    }
}

/// Persisted per-tile row at stage zero.
///
/// Extends the canonical tile with cumulative execution aggregates and the
/// timestamps the muxer maintains.
#[derive(Debug, Clone, PartialEq)]
pub struct TileStatusRow {
    pub tile: CanonicalTile,
    /// Cumulative wall-clock seconds across executions.
    pub duration: f64,
    /// High-water CPU percentage across executions.
    pub cpu_high: f64,
    /// High-water memory (MB) across executions.
    pub memory_high: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TileStatusRow {
    /// A freshly inserted row: zeroed aggregates, both timestamps at `now`.
    pub fn fresh(tile: CanonicalTile, now: DateTime<Utc>) -> Self {
        Self {
            tile,
            duration: 0.0,
            cpu_high: 0.0,
            memory_high: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.tile.relative_path
    }

    /// Merge an incoming canonical tile into this row.
    ///
    /// Overwrites name, index, both statuses, and lattice position/step;
    /// aggregates and `created_at` are preserved, `updated_at` advances.
    pub fn absorb(&mut self, incoming: &CanonicalTile, now: DateTime<Utc>) {
        self.tile.tile_name = incoming.tile_name.clone();
        self.tile.index = incoming.index;
        self.tile.prev_stage_status = incoming.prev_stage_status;
        self.tile.this_stage_status = incoming.this_stage_status;
        self.tile.lat_x = incoming.lat_x;
        self.tile.lat_y = incoming.lat_y;
        self.tile.lat_z = incoming.lat_z;
        self.tile.step_x = incoming.step_x;
        self.tile.step_y = incoming.step_y;
        self.tile.step_z = incoming.step_z;
        self.updated_at = now;
    }
}
