//! Per-record completion dispatch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::hub::SchedulerHub;
use crate::model::TaskExecutionRecord;
use crate::sink::{MetricsSink, SinkError};

/// Delay between hub-dispatch retries while a stage scheduler is absent.
pub const DISPATCH_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Dispatch failures that must leave the delivery unacknowledged.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("dispatch interrupted by shutdown")]
    Interrupted,
}

/// Applies one completion record: metrics write, then hub routing with
/// indefinite retry.
///
/// Effects are idempotent at (record id, stage id) granularity: a redelivered
/// record may write its metrics point again, but stage schedulers absorb the
/// repeat.
pub struct CompletionDispatcher {
    sink: Arc<dyn MetricsSink>,
    hub: Arc<SchedulerHub>,
    retry_delay: Duration,
}

impl CompletionDispatcher {
    pub fn new(sink: Arc<dyn MetricsSink>, hub: Arc<SchedulerHub>) -> Self {
        Self {
            sink,
            hub,
            retry_delay: DISPATCH_RETRY_DELAY,
        }
    }

    /// Overrides the hub-retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Dispatches one record.
    ///
    /// The metrics write happens first and exactly once per call; a sink
    /// failure aborts before any hub routing. Hub refusals (no scheduler for
    /// the stage yet) retry forever, waking at `retry_delay`, until handled
    /// or `shutdown` fires.
    pub async fn dispatch(
        &self,
        record: &TaskExecutionRecord,
        shutdown: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.sink.write_task_execution(record).await?;

        loop {
            if self.hub.on_task_execution_complete(record).await {
                return Ok(());
            }

            debug!(
                execution = %record.id,
                stage = %record.pipeline_stage_id,
                retry_in_secs = self.retry_delay.as_secs_f64(),
                "completion not handled; will retry"
            );

            tokio::select! {
                _ = shutdown.cancelled() => return Err(DispatchError::Interrupted),
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }
}
