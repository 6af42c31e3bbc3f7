//! Long-poll backend.
//!
//! Each `consume_*` call starts one worker that repeatedly receives a batch
//! from its queue and handles the messages in order. Handled and discarded
//! messages are deleted; retryable ones are released so they become visible
//! again.

mod aws;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{SQS, SqsSettings};
use crate::dispatch::dispatch;
use crate::{
    BrokerError, Disposition, KitchenNotification, MessageBroker, MessageHandler,
    OrderErrorMessage, OrderUpdateMessage, PaymentConfirmationMessage, Result, message,
};

pub use aws::AwsQueueClient;

/// A message returned by a receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,

    /// Opaque token used to delete or release this particular receipt.
    pub receipt_handle: String,

    pub body: String,
}

/// Wire client for a long-poll queue service.
#[async_trait]
pub trait QueueClient: Send + Sync + 'static {
    /// Returns whether the queue exists.
    async fn queue_exists(&self, queue_url: &str) -> Result<bool>;

    /// Receives up to `max_messages`, waiting at most `wait_time` for the
    /// first one. Received messages stay invisible to other receivers until
    /// deleted or released.
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>>;

    /// Permanently removes a received message.
    async fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()>;

    /// Makes a received message visible again (visibility timeout reset).
    async fn release_message(&self, queue_url: &str, receipt_handle: &str) -> Result<()>;

    async fn send_message(&self, queue_url: &str, body: &[u8]) -> Result<()>;

    /// Releases the connection. Idempotent.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// [`MessageBroker`] over a long-poll [`QueueClient`].
pub struct SqsBroker<C: QueueClient> {
    client: Arc<C>,
    settings: SqsSettings,
    workers: TaskTracker,
    closed: CancellationToken,
}

impl<C: QueueClient> SqsBroker<C> {
    /// Creates a broker after validating the settings.
    pub fn new(client: C, settings: SqsSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            client: Arc::new(client),
            settings,
            workers: TaskTracker::new(),
            closed: CancellationToken::new(),
        })
    }

    pub fn settings(&self) -> &SqsSettings {
        &self.settings
    }

    async fn start_worker<M>(
        &self,
        queue_url: &str,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<M>>,
    ) -> Result<()>
    where
        M: DeserializeOwned + Send + 'static,
    {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        if !self.client.queue_exists(queue_url).await? {
            return Err(BrokerError::QueueNotFound(queue_url.to_string()));
        }

        let worker = PollWorker {
            client: Arc::clone(&self.client),
            queue_url: queue_url.to_string(),
            max_messages: self.settings.max_messages,
            wait_time: self.settings.wait_time,
            error_backoff: self.settings.error_backoff,
            cancel,
            closed: self.closed.clone(),
        };
        self.workers.spawn(worker.run(handler));

        tracing::info!(queue = %queue_url, backend = SQS, "consumer started");
        Ok(())
    }
}

#[async_trait]
impl<C: QueueClient> MessageBroker for SqsBroker<C> {
    fn backend(&self) -> &'static str {
        SQS
    }

    async fn consume_order_updates(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<OrderUpdateMessage>>,
    ) -> Result<()> {
        let url = self.settings.order_updates_queue_url.clone();
        self.start_worker(&url, cancel, handler).await
    }

    async fn consume_payment_confirmations(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<PaymentConfirmationMessage>>,
    ) -> Result<()> {
        let url = self.settings.payment_confirmations_queue_url.clone();
        self.start_worker(&url, cancel, handler).await
    }

    async fn consume_order_errors(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<OrderErrorMessage>>,
    ) -> Result<()> {
        let url = self.settings.order_error_queue_url.clone();
        self.start_worker(&url, cancel, handler).await
    }

    #[tracing::instrument(skip(self, notification), fields(order_id = %notification.order_id))]
    async fn send_to_kitchen(&self, notification: &KitchenNotification) -> Result<()> {
        let body = message::encode(notification)?;
        self.publish_on_topic(&self.settings.kitchen_queue_url, &body)
            .await
    }

    async fn publish_on_topic(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        self.client.send_message(topic, payload).await?;
        tracing::debug!(queue = %topic, bytes = payload.len(), "message published");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.closed.cancel();
        self.workers.close();
        self.client.close().await?;
        tracing::info!(backend = SQS, "broker closed");
        Ok(())
    }

    async fn shutdown(&self) {
        self.workers.close();
        self.workers.wait().await;
    }
}

/// State owned by one poll loop.
struct PollWorker<C> {
    client: Arc<C>,
    queue_url: String,
    max_messages: u32,
    wait_time: Duration,
    error_backoff: Duration,
    cancel: CancellationToken,
    closed: CancellationToken,
}

impl<C: QueueClient> PollWorker<C> {
    fn stopping(&self) -> bool {
        self.cancel.is_cancelled() || self.closed.is_cancelled()
    }

    async fn run<M>(self, handler: Arc<dyn MessageHandler<M>>)
    where
        M: DeserializeOwned + Send + 'static,
    {
        let queue = self.queue_url.as_str();

        'poll: while !self.stopping() {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = self.closed.cancelled() => break,
                received = self.client.receive_messages(queue, self.max_messages, self.wait_time) => received,
            };

            let batch = match received {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(queue, error = %e, backoff = ?self.error_backoff, "receive failed, backing off");
                    metrics::counter!("broker_receive_errors_total", "queue" => queue.to_string())
                        .increment(1);
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = self.closed.cancelled() => break,
                        _ = tokio::time::sleep(self.error_backoff) => continue,
                    }
                }
            };

            let mut batch = batch.into_iter();
            while let Some(received) = batch.next() {
                let disposition = dispatch(queue, received.body.as_bytes(), handler.as_ref()).await;
                self.settle(&received, disposition).await;

                if self.stopping() {
                    // Hand the unprocessed rest of the batch back to the
                    // queue. Released messages go to the head, so the last
                    // one goes first.
                    let rest: Vec<ReceivedMessage> = batch.collect();
                    for unprocessed in rest.iter().rev() {
                        self.settle(unprocessed, Disposition::Requeue).await;
                    }
                    break 'poll;
                }
            }
        }

        tracing::info!(queue, "consumer stopped");
    }

    async fn settle(&self, received: &ReceivedMessage, disposition: Disposition) {
        let queue = self.queue_url.as_str();
        let result = match disposition {
            Disposition::Ack | Disposition::Discard => {
                self.client.delete_message(queue, &received.receipt_handle).await
            }
            Disposition::Requeue => {
                self.client.release_message(queue, &received.receipt_handle).await
            }
        };

        // An unsettled receipt stays with the queue service: it becomes
        // visible again after the visibility timeout, or when the
        // connection that received it is closed.
        if let Err(e) = result {
            tracing::warn!(queue, message_id = %received.message_id, ?disposition, error = %e, "failed to settle message");
        }
    }
}
