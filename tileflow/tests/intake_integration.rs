//! End-to-end completion-intake scenarios: broker delivery through decode,
//! metrics write, hub dispatch, and acknowledgement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tileflow::broker::MemoryBroker;
use tileflow::hub::{SchedulerHub, StageScheduler};
use tileflow::intake::{CompletionDispatcher, CompletionIntake, IntakeConfig};
use tileflow::model::TaskExecutionRecord;
use tileflow::sink::MemoryMetricsSink;

/// Scheduler that refuses the first `refusals` dispatches, then accepts.
struct ReluctantScheduler {
    stage: String,
    calls: AtomicUsize,
    refusals: usize,
}

impl ReluctantScheduler {
    fn new(stage: &str, refusals: usize) -> Self {
        Self {
            stage: stage.to_string(),
            calls: AtomicUsize::new(0),
            refusals,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageScheduler for ReluctantScheduler {
    fn stage_id(&self) -> &str {
        &self.stage
    }

    async fn on_task_execution_complete(&self, _record: &TaskExecutionRecord) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst) >= self.refusals
    }
}

fn payload(id: &str, stage: &str) -> String {
    format!(
        r#"{{"id": "{id}", "worker_id": "w-1", "tile_id": "a/b.tif",
             "pipeline_stage_id": "{stage}", "execution_status_code": 3,
             "completion_status_code": 4, "submitted_at": 1714564800000,
             "started_at": 1714564805000, "completed_at": 1714564930000,
             "cpu_time_seconds": 10.5, "max_cpu_percent": 200.0,
             "max_memory_mb": 512.0, "exit_code": 0}}"#
    )
}

fn fast_config() -> IntakeConfig {
    IntakeConfig {
        reconnect_initial: Duration::from_millis(5),
        reconnect_cap: Duration::from_millis(20),
        ..IntakeConfig::default()
    }
}

async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

#[tokio::test]
async fn s6_happy_path_metrics_precede_single_ack() {
    let broker = Arc::new(MemoryBroker::new());
    let sink = Arc::new(MemoryMetricsSink::new());
    let hub = Arc::new(SchedulerHub::new());
    let scheduler = Arc::new(ReluctantScheduler::new("stage-1", 0));
    hub.register(scheduler.clone());

    broker.publish(payload("e1", "stage-1"));

    let dispatcher = Arc::new(CompletionDispatcher::new(sink.clone(), hub));
    let intake = CompletionIntake::new(broker.clone(), dispatcher).with_config(fast_config());

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(intake.run(shutdown.clone()));

    assert!(
        wait_until(Duration::from_secs(2), || broker.unacked() == 0
            && broker.ready_len() == 0
            && sink.written().len() == 1)
        .await
    );
    assert_eq!(scheduler.calls(), 1);

    let record = &sink.written()[0];
    assert_eq!(record.id, "e1");
    assert_eq!(record.max_memory_mb, 512.0);
    // Timestamps were re-materialized as absolute instants.
    assert_eq!(
        record.submitted_at.unwrap().timestamp_millis(),
        1714564800000
    );

    shutdown.cancel();
    handle.await.unwrap();

    // No redelivery afterwards: the single ack stuck.
    assert_eq!(broker.ready_len(), 0);
    assert_eq!(broker.unacked(), 0);
}

#[tokio::test]
async fn s6_retry_path_acks_only_after_hub_accepts() {
    let broker = Arc::new(MemoryBroker::new());
    let sink = Arc::new(MemoryMetricsSink::new());
    let hub = Arc::new(SchedulerHub::new());
    // Refuses twice, accepts on the third call.
    let scheduler = Arc::new(ReluctantScheduler::new("stage-1", 2));
    hub.register(scheduler.clone());

    broker.publish(payload("e1", "stage-1"));

    let dispatcher = Arc::new(
        CompletionDispatcher::new(sink.clone(), hub).with_retry_delay(Duration::from_millis(10)),
    );
    let intake = CompletionIntake::new(broker.clone(), dispatcher).with_config(fast_config());

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(intake.run(shutdown.clone()));

    assert!(
        wait_until(Duration::from_secs(2), || broker.unacked() == 0
            && broker.ready_len() == 0)
        .await,
        "ack should land after the third dispatch attempt"
    );
    assert_eq!(scheduler.calls(), 3);
    // At least one metrics write, and the message was acked exactly once
    // (nothing left to redeliver).
    assert!(!sink.written().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
    assert_eq!(broker.ready_len(), 0);
}

#[tokio::test]
async fn sink_failure_blocks_ack_until_recovery() {
    let broker = Arc::new(MemoryBroker::new());
    let sink = Arc::new(MemoryMetricsSink::new());
    sink.set_fail(true);
    let hub = Arc::new(SchedulerHub::new());
    hub.register(Arc::new(ReluctantScheduler::new("stage-1", 0)));

    broker.publish(payload("e1", "stage-1"));

    let dispatcher = Arc::new(CompletionDispatcher::new(sink.clone(), hub));
    let intake = CompletionIntake::new(broker.clone(), dispatcher).with_config(fast_config());

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(intake.run(shutdown.clone()));

    // The failed write leaves the delivery unacked, and the broker requeues
    // it for another attempt.
    assert!(
        wait_until(Duration::from_secs(2), || sink.written().is_empty()
            && (broker.ready_len() == 1 || broker.unacked() == 1))
        .await
    );

    // Once the sink recovers, a redelivery completes the path.
    sink.set_fail(false);
    assert!(
        wait_until(Duration::from_secs(2), || !sink.written().is_empty()
            && broker.ready_len() == 0
            && broker.unacked() == 0)
        .await,
        "record should be written and acked after sink recovery"
    );

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn prefetch_bounds_unacked_deliveries_at_fifty() {
    let broker = Arc::new(MemoryBroker::new());
    let sink = Arc::new(MemoryMetricsSink::new());
    // No scheduler registered: every dispatch parks in the retry loop,
    // holding its delivery unacked.
    let hub = Arc::new(SchedulerHub::new());

    for i in 0..60 {
        broker.publish(payload(&format!("e{i}"), "stage-9"));
    }

    let dispatcher = Arc::new(
        CompletionDispatcher::new(sink.clone(), hub).with_retry_delay(Duration::from_secs(60)),
    );
    let intake = CompletionIntake::new(broker.clone(), dispatcher).with_config(fast_config());

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(intake.run(shutdown.clone()));

    assert!(
        wait_until(Duration::from_secs(2), || broker.unacked() == 50).await,
        "in-flight deliveries should reach the prefetch window"
    );
    // Holds there: the window never exceeds 50.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broker.unacked(), 50);
    assert_eq!(broker.ready_len(), 10);

    shutdown.cancel();
    handle.await.unwrap();

    // The dying consumer released everything for redelivery.
    assert_eq!(broker.unacked(), 0);
    assert_eq!(broker.ready_len(), 60);
}
