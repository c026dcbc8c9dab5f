//! Tileflow - scheduling core for tiled-microscopy image processing
//!
//! A *project* is one microscopy acquisition: a root directory holding a
//! lattice of image tiles, each of which traverses a linear sequence of
//! processing stages on worker machines. This crate keeps the per-tile
//! status table for stage zero accurate against two moving sources of truth:
//!
//! - the tile-inventory document the acquisition writes into the project
//!   root, ingested periodically by [`ingest`];
//! - task-execution completion reports arriving from workers over a durable
//!   queue, consumed by [`intake`] and routed through the [`hub`].
//!
//! External collaborators (the table store, control plane, metrics sink, and
//! broker) are injected behind traits; in-memory implementations back the
//! tests and local runs.
//!
//! # High-Level API
//!
//! The [`service`] module wires everything together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tileflow::broker::MemoryBroker;
//! use tileflow::clock::SystemClock;
//! use tileflow::config::Settings;
//! use tileflow::control::RecordingControlPlane;
//! use tileflow::model::Project;
//! use tileflow::service::TileflowService;
//! use tileflow::sink::MemoryMetricsSink;
//! use tileflow::store::MemoryStorage;
//!
//! let mut service = TileflowService::new(
//!     Settings::default(),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(RecordingControlPlane::new()),
//!     Arc::new(MemoryMetricsSink::new()),
//!     Arc::new(MemoryBroker::new()),
//!     Arc::new(SystemClock),
//! );
//! service.add_project(Project::new("p-1", "sample", "/data/p1"));
//! ```

pub mod broker;
pub mod clock;
pub mod config;
pub mod control;
pub mod hub;
pub mod ingest;
pub mod intake;
pub mod inventory;
pub mod logging;
pub mod model;
pub mod mux;
pub mod pathmap;
pub mod service;
pub mod sink;
pub mod store;

/// Version of the tileflow library and CLI.
///
/// Synchronized across all workspace members via the workspace manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
