//! Metrics-sink seam.
//!
//! Each task-execution completion is written to a time-series sink before the
//! broker message is acknowledged; a sink failure therefore blocks the ack
//! and the broker redelivers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::TaskExecutionRecord;

/// Errors writing a time-series point.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("metrics write failed: {0}")]
    Write(String),
}

/// Write-only, concurrency-safe execution-metrics sink.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write_task_execution(&self, record: &TaskExecutionRecord) -> Result<(), SinkError>;
}

/// Sink that retains records in memory; used by tests and local mode.
#[derive(Default)]
pub struct MemoryMetricsSink {
    records: Mutex<Vec<TaskExecutionRecord>>,
    fail: AtomicBool,
}

impl MemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, writes fail until cleared.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<TaskExecutionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for MemoryMetricsSink {
    async fn write_task_execution(&self, record: &TaskExecutionRecord) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Write("injected failure".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
