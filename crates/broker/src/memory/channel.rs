use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use crate::rabbitmq::{Acknowledger, ChannelClient, Delivery, DeliveryStream};
use crate::{BrokerError, Result};

#[derive(Default)]
pub(super) struct ChannelHub {
    queues: RwLock<HashMap<String, Arc<PushQueue>>>,
    delivery_tags: Arc<AtomicU64>,
}

impl ChannelHub {
    pub(super) async fn declare(&self, name: &str) {
        let mut queues = self.queues.write().await;
        if !queues.contains_key(name) {
            queues.insert(name.to_string(), Arc::new(PushQueue::new()));
        }
    }

    async fn get(&self, name: &str) -> Option<Arc<PushQueue>> {
        self.queues.read().await.get(name).cloned()
    }
}

struct Pending {
    body: Vec<u8>,
    redelivered: bool,
}

/// A queue with competing consumers: every subscriber pulls from the same
/// receiver, so each message goes to exactly one of them.
struct PushQueue {
    sender: mpsc::UnboundedSender<Pending>,
    receiver: Mutex<mpsc::UnboundedReceiver<Pending>>,
    published: AtomicUsize,
    acked: AtomicUsize,
    discarded: AtomicUsize,
    requeued: AtomicUsize,
}

impl PushQueue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            published: AtomicUsize::new(0),
            acked: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            requeued: AtomicUsize::new(0),
        }
    }

    fn requeue(&self, body: Vec<u8>) {
        // The queue owns the receiver, so sending cannot fail while it lives.
        let _ = self.sender.send(Pending {
            body,
            redelivered: true,
        });
    }
}

/// Settles one in-memory delivery.
///
/// Unsettled deliveries on a closed channel go back to the queue, as a real
/// broker does when a channel drops with unacked messages.
struct MemoryAcker {
    queue: Arc<PushQueue>,
    body: Vec<u8>,
    settled: AtomicBool,
    closed: CancellationToken,
}

impl MemoryAcker {
    fn settle(&self) -> Result<()> {
        if self.settled.swap(true, Ordering::SeqCst) {
            return Err(BrokerError::Acknowledge(
                "delivery already settled".to_string(),
            ));
        }
        if self.closed.is_cancelled() {
            self.queue.requeue(self.body.clone());
            return Err(BrokerError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(&self) -> Result<()> {
        self.settle()?;
        self.queue.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(&self, requeue: bool) -> Result<()> {
        self.settle()?;
        if requeue {
            self.queue.requeue(self.body.clone());
            self.queue.requeued.fetch_add(1, Ordering::SeqCst);
        } else {
            self.queue.discarded.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// In-memory push [`ChannelClient`].
pub struct InMemoryChannelClient {
    hub: Arc<ChannelHub>,
    closed: CancellationToken,
}

impl InMemoryChannelClient {
    pub(super) fn new(hub: Arc<ChannelHub>) -> Self {
        Self {
            hub,
            closed: CancellationToken::new(),
        }
    }

    async fn queue(&self, name: &str) -> Result<Arc<PushQueue>> {
        self.hub
            .get(name)
            .await
            .ok_or_else(|| BrokerError::QueueNotFound(name.to_string()))
    }

    pub async fn published_count(&self, queue: &str) -> Result<usize> {
        Ok(self.queue(queue).await?.published.load(Ordering::SeqCst))
    }

    pub async fn acked_count(&self, queue: &str) -> Result<usize> {
        Ok(self.queue(queue).await?.acked.load(Ordering::SeqCst))
    }

    /// Deliveries rejected without requeue.
    pub async fn discarded_count(&self, queue: &str) -> Result<usize> {
        Ok(self.queue(queue).await?.discarded.load(Ordering::SeqCst))
    }

    pub async fn requeued_count(&self, queue: &str) -> Result<usize> {
        Ok(self.queue(queue).await?.requeued.load(Ordering::SeqCst))
    }

    /// Removes and returns every queued body. Do not call while a
    /// subscriber is attached to the queue.
    pub async fn drain_queue(&self, queue: &str) -> Result<Vec<Vec<u8>>> {
        let queue = self.queue(queue).await?;
        let mut receiver = queue.receiver.lock().await;
        let mut bodies = Vec::new();
        while let Ok(pending) = receiver.try_recv() {
            bodies.push(pending.body);
        }
        Ok(bodies)
    }
}

struct Subscription {
    queue: Arc<PushQueue>,
    tags: Arc<AtomicU64>,
    closed: CancellationToken,
}

#[async_trait]
impl ChannelClient for InMemoryChannelClient {
    async fn subscribe(&self, queue: &str, prefetch_count: u16) -> Result<DeliveryStream> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        let push_queue = self
            .hub
            .get(queue)
            .await
            .ok_or_else(|| BrokerError::Subscription {
                queue: queue.to_string(),
                reason: "queue is not declared".to_string(),
            })?;
        tracing::debug!(queue, prefetch_count, "subscribed");

        let subscription = Subscription {
            queue: push_queue,
            tags: Arc::clone(&self.hub.delivery_tags),
            closed: self.closed.clone(),
        };

        let stream = futures_util::stream::unfold(subscription, |sub| async move {
            let pending = {
                let mut receiver = sub.queue.receiver.lock().await;
                tokio::select! {
                    biased;
                    _ = sub.closed.cancelled() => None,
                    pending = receiver.recv() => pending,
                }
            };

            match pending {
                Some(pending) => {
                    let tag = sub.tags.fetch_add(1, Ordering::SeqCst) + 1;
                    let acker = MemoryAcker {
                        queue: Arc::clone(&sub.queue),
                        body: pending.body.clone(),
                        settled: AtomicBool::new(false),
                        closed: sub.closed.clone(),
                    };
                    let delivery = Delivery::new(tag, pending.body, pending.redelivered, acker);
                    Some((delivery, sub))
                }
                None => None,
            }
        });

        Ok(Box::pin(stream))
    }

    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        let queue = self
            .hub
            .get(routing_key)
            .await
            .ok_or_else(|| BrokerError::Publish {
                destination: routing_key.to_string(),
                reason: "no queue bound to routing key".to_string(),
            })?;

        queue
            .sender
            .send(Pending {
                body: body.to_vec(),
                redelivered: false,
            })
            .map_err(|e| BrokerError::Publish {
                destination: routing_key.to_string(),
                reason: e.to_string(),
            })?;
        queue.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }
}
