//! In-process broker with AMQP-like accounting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{BrokerError, Delivery, DeliveryAck, DeliveryStream, MessageSource};

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Vec<u8>>,
    unacked: usize,
}

#[derive(Default)]
struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
}

/// In-memory [`MessageSource`] with faithful prefetch, unacked, and
/// redelivery accounting.
///
/// A delivery dropped without acknowledgement is requeued at the head, which
/// mirrors broker requeue-on-release behavior. `fail_connects` makes the next
/// N `connect` calls fail, for exercising the consumer's backoff path.
#[derive(Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
    connect_failures: AtomicUsize,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues one message.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) {
        let mut queue = self.shared.state.lock().unwrap();
        queue.ready.push_back(payload.into());
        drop(queue);
        self.shared.notify.notify_waiters();
    }

    /// Messages waiting for delivery.
    pub fn ready_len(&self) -> usize {
        self.shared.state.lock().unwrap().ready.len()
    }

    /// Delivered but not yet acknowledged messages.
    pub fn unacked(&self) -> usize {
        self.shared.state.lock().unwrap().unacked
    }

    /// Makes the next `count` connect attempts fail.
    pub fn fail_connects(&self, count: usize) {
        self.connect_failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSource for MemoryBroker {
    async fn connect(
        &self,
        _queue: &str,
        prefetch: u16,
    ) -> Result<Box<dyn DeliveryStream>, BrokerError> {
        let remaining = self
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if remaining {
            return Err(BrokerError::Connect("injected connect failure".to_string()));
        }
        Ok(Box::new(MemoryStream {
            shared: Arc::clone(&self.shared),
            prefetch,
        }))
    }
}

struct MemoryStream {
    shared: Arc<Shared>,
    prefetch: u16,
}

#[async_trait]
impl DeliveryStream for MemoryStream {
    async fn next(&mut self) -> Result<Delivery, BrokerError> {
        loop {
            // Register for wakeups before inspecting state so a concurrent
            // publish or ack cannot slip between the check and the await.
            let notified = self.shared.notify.notified();
            {
                let mut queue = self.shared.state.lock().unwrap();
                if queue.unacked < usize::from(self.prefetch) {
                    if let Some(payload) = queue.ready.pop_front() {
                        queue.unacked += 1;
                        let ack = MemoryAck {
                            shared: Arc::clone(&self.shared),
                            payload: Some(payload.clone()),
                        };
                        return Ok(Delivery::new(payload, Box::new(ack)));
                    }
                }
            }
            notified.await;
        }
    }
}

struct MemoryAck {
    shared: Arc<Shared>,
    /// Retained until acknowledged so an unacked drop can requeue it.
    payload: Option<Vec<u8>>,
}

#[async_trait]
impl DeliveryAck for MemoryAck {
    async fn ack(mut self: Box<Self>) -> Result<(), BrokerError> {
        self.payload = None;
        let mut queue = self.shared.state.lock().unwrap();
        queue.unacked = queue.unacked.saturating_sub(1);
        drop(queue);
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

impl Drop for MemoryAck {
    fn drop(&mut self) {
        if let Some(payload) = self.payload.take() {
            let mut queue = self.shared.state.lock().unwrap();
            queue.unacked = queue.unacked.saturating_sub(1);
            queue.ready.push_front(payload);
            drop(queue);
            self.shared.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn next_with_timeout(stream: &mut Box<dyn DeliveryStream>) -> Option<Delivery> {
        tokio::time::timeout(Duration::from_millis(50), stream.next())
            .await
            .ok()
            .map(|r| r.unwrap())
    }

    #[tokio::test]
    async fn publish_then_consume() {
        let broker = MemoryBroker::new();
        broker.publish(b"one".to_vec());

        let mut stream = broker.connect("q", 10).await.unwrap();
        let delivery = stream.next().await.unwrap();
        assert_eq!(delivery.payload, b"one");
        assert_eq!(broker.unacked(), 1);

        delivery.ack().await.unwrap();
        assert_eq!(broker.unacked(), 0);
    }

    #[tokio::test]
    async fn prefetch_window_blocks_delivery() {
        let broker = MemoryBroker::new();
        for i in 0..3 {
            broker.publish(format!("m{}", i).into_bytes());
        }

        let mut stream = broker.connect("q", 2).await.unwrap();
        let first = stream.next().await.unwrap();
        let _second = stream.next().await.unwrap();
        assert_eq!(broker.unacked(), 2);

        // Third delivery must wait for an ack.
        assert!(next_with_timeout(&mut stream).await.is_none());

        first.ack().await.unwrap();
        let third = next_with_timeout(&mut stream).await.expect("freed slot");
        assert_eq!(third.payload, b"m2");
    }

    #[tokio::test]
    async fn dropped_delivery_is_requeued() {
        let broker = MemoryBroker::new();
        broker.publish(b"again".to_vec());

        let mut stream = broker.connect("q", 10).await.unwrap();
        let delivery = stream.next().await.unwrap();
        drop(delivery);

        assert_eq!(broker.unacked(), 0);
        assert_eq!(broker.ready_len(), 1);

        let redelivered = stream.next().await.unwrap();
        assert_eq!(redelivered.payload, b"again");
        redelivered.ack().await.unwrap();
    }

    #[tokio::test]
    async fn injected_connect_failures_then_recovery() {
        let broker = MemoryBroker::new();
        broker.fail_connects(2);

        assert!(broker.connect("q", 1).await.is_err());
        assert!(broker.connect("q", 1).await.is_err());
        assert!(broker.connect("q", 1).await.is_ok());
    }
}
