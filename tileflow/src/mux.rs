//! Tile muxing: reconciling a freshly parsed inventory against the persisted
//! tile-status table.
//!
//! The muxer is pure given its inputs and the injected clock: it computes an
//! insert/update/delete plan but never touches storage itself. A mass-deletion
//! guard refuses the whole pass when the inventory shrank implausibly,
//! protecting the table from a truncated or misplaced inventory file.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::clock::Clock;
use crate::model::{CanonicalTile, TileStatusRow};

/// Default mass-deletion guard threshold.
///
/// A pass that would drop more than this many tiles relative to the persisted
/// table is refused outright.
pub const MASS_DELETION_GUARD: usize = 1000;

/// Ordered mutation plan for one ingest pass.
///
/// Bucket ordering: inserts and updates follow inventory document order,
/// deletes follow the persisted table's order. `to_reset` is reserved for
/// cross-stage reset cascades driven by surrounding stages; the inventory
/// stage never populates it.
#[derive(Debug, Clone, Default)]
pub struct MuxPlan {
    pub to_insert: Vec<TileStatusRow>,
    pub to_update: Vec<TileStatusRow>,
    pub to_delete: Vec<String>,
    pub to_reset: Vec<String>,
}

impl MuxPlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.to_reset.is_empty()
    }
}

/// Result of one mux pass.
#[derive(Debug)]
pub enum MuxOutcome {
    /// A plan was produced (possibly empty).
    Plan(MuxPlan),
    /// The mass-deletion guard refused the pass; persistence must be left
    /// untouched and the pass treated as a transient anomaly.
    GuardTripped {
        persisted_count: usize,
        inventory_count: usize,
    },
}

/// Computes mutation plans from (inventory, persisted table) pairs.
pub struct TileMuxer {
    clock: Arc<dyn Clock>,
    guard_threshold: usize,
}

impl TileMuxer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            guard_threshold: MASS_DELETION_GUARD,
        }
    }

    /// Overrides the mass-deletion guard threshold.
    pub fn with_guard_threshold(mut self, threshold: usize) -> Self {
        self.guard_threshold = threshold;
        self
    }

    /// Diffs `inventory` against `persisted`, keyed by `relative_path`.
    ///
    /// Duplicate paths within the inventory collapse to their first
    /// occurrence. A persisted row is updated only when its recorded
    /// `prev_stage_status` differs from the incoming `this_stage_status`;
    /// the comparison is intentionally asymmetric (it detects stage
    /// completion) and is authoritative.
    pub fn mux(&self, inventory: &[CanonicalTile], persisted: &[TileStatusRow]) -> MuxOutcome {
        if persisted.len().saturating_sub(inventory.len()) > self.guard_threshold {
            warn!(
                persisted = persisted.len(),
                inventory = inventory.len(),
                threshold = self.guard_threshold,
                "mass-deletion guard tripped; refusing mux pass"
            );
            return MuxOutcome::GuardTripped {
                persisted_count: persisted.len(),
                inventory_count: inventory.len(),
            };
        }

        let now = self.clock.now();

        // First occurrence wins for duplicated paths.
        let mut incoming: Vec<&CanonicalTile> = Vec::with_capacity(inventory.len());
        let mut incoming_keys: HashMap<&str, ()> = HashMap::with_capacity(inventory.len());
        for tile in inventory {
            if incoming_keys.insert(tile.relative_path.as_str(), ()).is_none() {
                incoming.push(tile);
            }
        }

        let persisted_by_key: HashMap<&str, &TileStatusRow> = persisted
            .iter()
            .map(|row| (row.relative_path(), row))
            .collect();

        let mut plan = MuxPlan::default();

        for tile in &incoming {
            match persisted_by_key.get(tile.relative_path.as_str()) {
                None => {
                    plan.to_insert
                        .push(TileStatusRow::fresh((*tile).clone(), now));
                }
                Some(existing) => {
                    if existing.tile.prev_stage_status != tile.this_stage_status {
                        let mut merged = (*existing).clone();
                        merged.absorb(tile, now);
                        plan.to_update.push(merged);
                    }
                }
            }
        }

        for row in persisted {
            if !incoming_keys.contains_key(row.relative_path()) {
                plan.to_delete.push(row.relative_path().to_string());
            }
        }

        MuxOutcome::Plan(plan)
    }
}
