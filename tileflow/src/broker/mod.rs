//! Durable message-queue seam.
//!
//! The deployment broker is AMQP-style: a durable named queue, per-message
//! manual acknowledgement, and a bounded prefetch window of unacknowledged
//! deliveries. The core consumes through these traits; [`MemoryBroker`]
//! implements them in-process with the same accounting for tests and local
//! mode.
//!
//! Redelivery contract: a [`Delivery`] dropped without acknowledgement is
//! returned to the queue. Consumers therefore ack only after a record is
//! durably handled.

mod memory;

pub use memory::MemoryBroker;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Queue carrying task-execution completion records.
pub const TASK_EXECUTION_QUEUE: &str = "TaskExecutionUpdateQueue";

/// Default in-flight prefetch window.
pub const DEFAULT_PREFETCH: u16 = 50;

/// Errors from the broker seam.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connect failed: {0}")]
    Connect(String),

    #[error("broker connection lost: {0}")]
    ConnectionLost(String),

    #[error("acknowledgement failed: {0}")]
    Ack(String),
}

/// Acknowledgement handle for one delivery.
#[async_trait]
pub trait DeliveryAck: Send {
    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;
}

/// One queued message plus its ack handle.
pub struct Delivery {
    pub payload: Vec<u8>,
    ack: Box<dyn DeliveryAck>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, ack: Box<dyn DeliveryAck>) -> Self {
        Self { payload, ack }
    }

    /// Acknowledges the delivery, consuming it.
    pub async fn ack(self) -> Result<(), BrokerError> {
        self.ack.ack().await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// An established consumer channel.
#[async_trait]
pub trait DeliveryStream: Send {
    /// Waits for the next delivery. An error means the connection is gone
    /// and the caller must reconnect.
    async fn next(&mut self) -> Result<Delivery, BrokerError>;
}

/// Connection factory for a durable queue.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Connects, declares `queue` durably, applies `prefetch` QoS, and
    /// starts consuming with manual acknowledgement.
    async fn connect(
        &self,
        queue: &str,
        prefetch: u16,
    ) -> Result<Box<dyn DeliveryStream>, BrokerError>;
}

/// Exponential reconnect backoff with a cap.
///
/// One policy covers initial connects and reconnects; a successful connect
/// resets the sequence.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    cap: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            initial,
            cap,
            next: initial,
        }
    }

    /// The delay to wait before the next attempt; doubles up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = std::cmp::min(delay * 2, self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60))
    }
}
