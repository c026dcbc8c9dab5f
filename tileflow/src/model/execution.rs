//! Task-execution completion records and their broker wire form.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Terminal report for one task execution, as dispatched to stage schedulers.
///
/// Timestamps are re-materialized from the wire's epoch-millisecond integers
/// into absolute UTC instants before any component sees the record.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskExecutionRecord {
    pub id: String,
    pub worker_id: String,
    pub tile_id: String,
    pub pipeline_stage_id: String,
    pub execution_status_code: i32,
    pub completion_status_code: i32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cpu_time_seconds: f64,
    pub max_cpu_percent: f64,
    pub max_memory_mb: f64,
    pub exit_code: i32,
}

/// Wire form of a completion record as published to the broker queue.
#[derive(Debug, Deserialize)]
struct WireTaskExecution {
    id: String,
    worker_id: String,
    tile_id: String,
    pipeline_stage_id: String,
    execution_status_code: i32,
    completion_status_code: i32,
    /// Epoch milliseconds, absent when the worker never reached that point.
    submitted_at: Option<i64>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    #[serde(default)]
    cpu_time_seconds: f64,
    #[serde(default)]
    max_cpu_percent: f64,
    #[serde(default)]
    max_memory_mb: f64,
    #[serde(default)]
    exit_code: i32,
}

fn millis_to_utc(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// Decodes a broker payload into a [`TaskExecutionRecord`].
///
/// Fails on malformed JSON or missing required fields; the consumer treats
/// that as a poison message (logged, acked, dropped).
pub fn decode_task_execution(payload: &[u8]) -> Result<TaskExecutionRecord, serde_json::Error> {
    let wire: WireTaskExecution = serde_json::from_slice(payload)?;
    Ok(TaskExecutionRecord {
        id: wire.id,
        worker_id: wire.worker_id,
        tile_id: wire.tile_id,
        pipeline_stage_id: wire.pipeline_stage_id,
        execution_status_code: wire.execution_status_code,
        completion_status_code: wire.completion_status_code,
        submitted_at: millis_to_utc(wire.submitted_at),
        started_at: millis_to_utc(wire.started_at),
        completed_at: millis_to_utc(wire.completed_at),
        cpu_time_seconds: wire.cpu_time_seconds,
        max_cpu_percent: wire.max_cpu_percent,
        max_memory_mb: wire.max_memory_mb,
        exit_code: wire.exit_code,
    })
}
