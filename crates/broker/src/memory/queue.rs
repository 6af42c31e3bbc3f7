use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::sqs::{QueueClient, ReceivedMessage};
use crate::{BrokerError, Result};

#[derive(Default)]
pub(super) struct QueueHub {
    queues: RwLock<HashMap<String, Arc<MemoryQueue>>>,
}

impl QueueHub {
    pub(super) async fn create(&self, url: &str) {
        self.queues
            .write()
            .await
            .entry(url.to_string())
            .or_default();
    }

    async fn get(&self, url: &str) -> Option<Arc<MemoryQueue>> {
        self.queues.read().await.get(url).cloned()
    }

    async fn all(&self) -> Vec<Arc<MemoryQueue>> {
        self.queues.read().await.values().cloned().collect()
    }
}

#[derive(Default)]
struct MemoryQueue {
    buffer: Mutex<QueueBuffer>,
    arrivals: Notify,
}

#[derive(Default)]
struct QueueBuffer {
    visible: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlight>,
    deleted: usize,
    next_sequence: u64,
    failures_to_inject: usize,
}

impl QueueBuffer {
    /// Moves every receipt held by `receiver` back to the head of the queue,
    /// in original send order. Returns how many were moved.
    fn return_receipts_of(&mut self, receiver: Uuid) -> usize {
        let handles: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, held)| held.receiver == receiver)
            .map(|(handle, _)| handle.clone())
            .collect();

        let mut returned: Vec<StoredMessage> = handles
            .iter()
            .filter_map(|handle| self.in_flight.remove(handle))
            .map(|held| held.message)
            .collect();
        returned.sort_by_key(|message| message.sequence);

        let count = returned.len();
        for message in returned.into_iter().rev() {
            self.visible.push_front(message);
        }
        count
    }
}

#[derive(Clone)]
struct StoredMessage {
    sequence: u64,
    message_id: String,
    body: String,
}

/// A received message and the connection that received it.
struct InFlight {
    message: StoredMessage,
    receiver: Uuid,
}

/// In-memory long-poll [`QueueClient`].
///
/// Received messages move to an in-flight set keyed by a fresh receipt
/// handle; releasing puts them back at the head of the queue. Closing the
/// client puts back every receipt it still holds, the way an expired
/// visibility timeout would.
pub struct InMemoryQueueClient {
    id: Uuid,
    hub: Arc<QueueHub>,
    closed: CancellationToken,
}

impl InMemoryQueueClient {
    pub(super) fn new(hub: Arc<QueueHub>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hub,
            closed: CancellationToken::new(),
        }
    }

    async fn queue(&self, url: &str) -> Result<Arc<MemoryQueue>> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        self.hub
            .get(url)
            .await
            .ok_or_else(|| BrokerError::QueueNotFound(url.to_string()))
    }

    /// Makes the next `count` receive calls on the queue fail.
    pub async fn fail_next_receives(&self, queue_url: &str, count: usize) -> Result<()> {
        let queue = self.queue(queue_url).await?;
        queue.buffer.lock().await.failures_to_inject = count;
        Ok(())
    }

    /// Messages waiting to be received.
    pub async fn visible_count(&self, queue_url: &str) -> Result<usize> {
        let queue = self.queue(queue_url).await?;
        let count = queue.buffer.lock().await.visible.len();
        Ok(count)
    }

    /// Messages received but neither deleted nor released.
    pub async fn in_flight_count(&self, queue_url: &str) -> Result<usize> {
        let queue = self.queue(queue_url).await?;
        let count = queue.buffer.lock().await.in_flight.len();
        Ok(count)
    }

    /// Messages deleted since the queue was created.
    pub async fn deleted_count(&self, queue_url: &str) -> Result<usize> {
        let queue = self.queue(queue_url).await?;
        let count = queue.buffer.lock().await.deleted;
        Ok(count)
    }

    /// Removes and returns every visible message body.
    pub async fn drain(&self, queue_url: &str) -> Result<Vec<String>> {
        let queue = self.queue(queue_url).await?;
        let mut buffer = queue.buffer.lock().await;
        Ok(buffer.visible.drain(..).map(|m| m.body).collect())
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn queue_exists(&self, queue_url: &str) -> Result<bool> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        Ok(self.hub.get(queue_url).await.is_some())
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let queue = self.queue(queue_url).await?;
        let deadline = Instant::now() + wait_time;

        loop {
            // Register for wakeups before looking, so an arrival between the
            // check and the wait is not missed.
            let arrival = queue.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            {
                let mut buffer = queue.buffer.lock().await;
                if buffer.failures_to_inject > 0 {
                    buffer.failures_to_inject -= 1;
                    return Err(BrokerError::Receive {
                        queue: queue_url.to_string(),
                        reason: "injected receive failure".to_string(),
                    });
                }

                if !buffer.visible.is_empty() {
                    let take = buffer.visible.len().min(max_messages as usize);
                    let taken: Vec<StoredMessage> = buffer.visible.drain(..take).collect();
                    let mut batch = Vec::with_capacity(take);
                    for stored in taken {
                        let receipt_handle = Uuid::new_v4().to_string();
                        batch.push(ReceivedMessage {
                            message_id: stored.message_id.clone(),
                            receipt_handle: receipt_handle.clone(),
                            body: stored.body.clone(),
                        });
                        buffer.in_flight.insert(
                            receipt_handle,
                            InFlight {
                                message: stored,
                                receiver: self.id,
                            },
                        );
                    }
                    return Ok(batch);
                }
            }

            tokio::select! {
                _ = self.closed.cancelled() => return Err(BrokerError::Closed),
                _ = tokio::time::sleep_until(deadline) => return Ok(Vec::new()),
                _ = &mut arrival => {}
            }
        }
    }

    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        let queue = self.queue(queue_url).await?;
        let mut buffer = queue.buffer.lock().await;
        buffer
            .in_flight
            .remove(receipt_handle)
            .ok_or_else(|| BrokerError::Acknowledge(format!("unknown receipt handle {receipt_handle}")))?;
        buffer.deleted += 1;
        Ok(())
    }

    async fn release_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()> {
        let queue = self.queue(queue_url).await?;
        {
            let mut buffer = queue.buffer.lock().await;
            let held = buffer.in_flight.remove(receipt_handle).ok_or_else(|| {
                BrokerError::Acknowledge(format!("unknown receipt handle {receipt_handle}"))
            })?;
            buffer.visible.push_front(held.message);
        }
        queue.arrivals.notify_waiters();
        Ok(())
    }

    async fn send_message(&self, queue_url: &str, body: &[u8]) -> Result<()> {
        let queue = self.queue(queue_url).await?;
        let body = String::from_utf8(body.to_vec()).map_err(|e| BrokerError::Publish {
            destination: queue_url.to_string(),
            reason: e.to_string(),
        })?;

        {
            let mut buffer = queue.buffer.lock().await;
            let sequence = buffer.next_sequence;
            buffer.next_sequence += 1;
            buffer.visible.push_back(StoredMessage {
                sequence,
                message_id: Uuid::new_v4().to_string(),
                body,
            });
        }
        queue.arrivals.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.closed.cancel();

        for queue in self.hub.all().await {
            let returned = queue.buffer.lock().await.return_receipts_of(self.id);
            if returned > 0 {
                tracing::debug!(returned, "unsettled receipts returned on close");
                queue.arrivals.notify_waiters();
            }
        }
        Ok(())
    }
}
