//! Project input ingestion loops.
//!
//! Each project gets one [`ProjectIngestor`], a periodic worker that
//! classifies the project root, parses its inventory, muxes the parsed tiles
//! against the persisted table, applies the plan, and snapshots the accepted
//! inventory. Ticks never overlap within a project; distinct projects run in
//! parallel and share only the table store. The [`IngestorPool`] owns the
//! workers and carries the per-project exit flag.

mod pool;
mod worker;

pub use pool::IngestorPool;
pub use worker::{IngestError, IngestorConfig, ProjectIngestor, TickOutcome};
