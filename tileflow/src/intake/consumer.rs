//! Durable-queue consumer for completion records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::{CompletionDispatcher, DispatchError};
use crate::broker::{Backoff, Delivery, MessageSource, DEFAULT_PREFETCH, TASK_EXECUTION_QUEUE};
use crate::model::decode_task_execution;

/// Consumer tuning.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Durable queue to consume.
    pub queue: String,
    /// In-flight prefetch window.
    pub prefetch: u16,
    /// First reconnect delay; doubles per failure up to `reconnect_cap`.
    pub reconnect_initial: Duration,
    pub reconnect_cap: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            queue: TASK_EXECUTION_QUEUE.to_string(),
            prefetch: DEFAULT_PREFETCH,
            reconnect_initial: Duration::from_secs(5),
            reconnect_cap: Duration::from_secs(60),
        }
    }
}

/// The completion-intake consumer loop.
///
/// Connects to the broker (declaring the durable queue and prefetch QoS),
/// then processes deliveries concurrently up to the prefetch window. Each
/// delivery is decoded and dispatched; the delivery is acknowledged only
/// after dispatch confirms handling. Undecodable payloads are acknowledged
/// and dropped so they cannot redeliver forever. Connection loss triggers
/// reconnection under one exponential backoff policy.
pub struct CompletionIntake {
    source: Arc<dyn MessageSource>,
    dispatcher: Arc<CompletionDispatcher>,
    config: IntakeConfig,
}

impl CompletionIntake {
    pub fn new(source: Arc<dyn MessageSource>, dispatcher: Arc<CompletionDispatcher>) -> Self {
        Self {
            source,
            dispatcher,
            config: IntakeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IntakeConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs until `shutdown` fires.
    ///
    /// On return every in-flight handler has finished; deliveries they held
    /// without acknowledgement are back with the broker.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut backoff = Backoff::new(self.config.reconnect_initial, self.config.reconnect_cap);
        let mut handlers: JoinSet<()> = JoinSet::new();

        'outer: loop {
            let mut stream = tokio::select! {
                _ = shutdown.cancelled() => break 'outer,
                connected = self.source.connect(&self.config.queue, self.config.prefetch) => {
                    match connected {
                        Ok(stream) => {
                            info!(queue = %self.config.queue, prefetch = self.config.prefetch,
                                  "completion consumer connected");
                            backoff.reset();
                            stream
                        }
                        Err(error) => {
                            let delay = backoff.next_delay();
                            warn!(%error, retry_in_secs = delay.as_secs_f64(),
                                  "broker connect failed");
                            tokio::select! {
                                _ = shutdown.cancelled() => break 'outer,
                                _ = tokio::time::sleep(delay) => {}
                            }
                            continue;
                        }
                    }
                }
            };

            loop {
                // Reap finished handlers so the set stays bounded.
                while handlers.try_join_next().is_some() {}

                tokio::select! {
                    _ = shutdown.cancelled() => break 'outer,
                    delivery = stream.next() => match delivery {
                        Ok(delivery) => {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            let token = shutdown.clone();
                            handlers.spawn(async move {
                                process_delivery(delivery, dispatcher, token).await;
                            });
                        }
                        Err(error) => {
                            let delay = backoff.next_delay();
                            warn!(%error, retry_in_secs = delay.as_secs_f64(),
                                  "broker connection lost; reconnecting");
                            tokio::select! {
                                _ = shutdown.cancelled() => break 'outer,
                                _ = tokio::time::sleep(delay) => {}
                            }
                            break;
                        }
                    }
                }
            }
        }

        // Drain handlers; cancelled dispatch retries return promptly and drop
        // their deliveries unacked for redelivery.
        while handlers.join_next().await.is_some() {}
        debug!("completion consumer stopped");
    }
}

async fn process_delivery(
    delivery: Delivery,
    dispatcher: Arc<CompletionDispatcher>,
    shutdown: CancellationToken,
) {
    let record = match decode_task_execution(&delivery.payload) {
        Ok(record) => record,
        Err(error) => {
            warn!(%error, "dropping undecodable completion message");
            if let Err(error) = delivery.ack().await {
                warn!(%error, "failed to ack dropped message");
            }
            return;
        }
    };

    match dispatcher.dispatch(&record, &shutdown).await {
        Ok(()) => {
            if let Err(error) = delivery.ack().await {
                warn!(%error, execution = %record.id,
                      "ack failed; broker will redeliver");
            }
        }
        Err(DispatchError::Interrupted) => {
            debug!(execution = %record.id,
                   "shutdown during dispatch; releasing delivery");
        }
        Err(error) => {
            warn!(%error, execution = %record.id,
                  "dispatch failed; leaving delivery unacked");
        }
    }
}
