//! Push backend.
//!
//! Each `consume_*` call subscribes to its queue and starts one worker that
//! drains the delivery stream. Successes are acked, discards are rejected
//! without requeue and retryable failures are rejected with requeue.

mod amqp;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{RABBITMQ, RabbitMqSettings};
use crate::dispatch::dispatch;
use crate::{
    BrokerError, Disposition, KitchenNotification, MessageBroker, MessageHandler,
    OrderErrorMessage, OrderUpdateMessage, PaymentConfirmationMessage, Result, message,
};

pub use amqp::AmqpChannelClient;

/// Settles a single delivery on the channel it arrived on.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<()>;

    /// Rejects the delivery. With `requeue` the broker redelivers it,
    /// otherwise it is dropped (or dead-lettered by broker policy).
    async fn nack(&self, requeue: bool) -> Result<()>;
}

/// A message pushed by the broker.
pub struct Delivery {
    pub delivery_tag: u64,
    pub body: Vec<u8>,

    /// True if this message was delivered before and not acked.
    pub redelivered: bool,

    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(
        delivery_tag: u64,
        body: Vec<u8>,
        redelivered: bool,
        acker: impl Acknowledger + 'static,
    ) -> Self {
        Self {
            delivery_tag,
            body,
            redelivered,
            acker: Box::new(acker),
        }
    }

    pub async fn ack(&self) -> Result<()> {
        self.acker.ack().await
    }

    pub async fn nack(&self, requeue: bool) -> Result<()> {
        self.acker.nack(requeue).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("body_len", &self.body.len())
            .field("redelivered", &self.redelivered)
            .finish_non_exhaustive()
    }
}

/// Stream of deliveries for one subscription. Ends when the subscription or
/// the channel is closed.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Delivery> + Send>>;

/// Wire client for a push-style broker channel.
#[async_trait]
pub trait ChannelClient: Send + Sync + 'static {
    /// Starts a consumer on the queue. Fails with
    /// [`BrokerError::Subscription`] if the queue cannot be consumed.
    async fn subscribe(&self, queue: &str, prefetch_count: u16) -> Result<DeliveryStream>;

    /// Publishes on the default exchange with the given routing key.
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<()>;

    /// Closes the channel and ends every open subscription. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// [`MessageBroker`] over a push-style [`ChannelClient`].
pub struct RabbitMqBroker<C: ChannelClient> {
    channel: Arc<C>,
    settings: RabbitMqSettings,
    workers: TaskTracker,
    closed: CancellationToken,
}

impl<C: ChannelClient> RabbitMqBroker<C> {
    /// Creates a broker after validating the settings.
    pub fn new(channel: C, settings: RabbitMqSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            channel: Arc::new(channel),
            settings,
            workers: TaskTracker::new(),
            closed: CancellationToken::new(),
        })
    }

    pub fn settings(&self) -> &RabbitMqSettings {
        &self.settings
    }

    async fn start_worker<M>(
        &self,
        queue: &str,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<M>>,
    ) -> Result<()>
    where
        M: DeserializeOwned + Send + 'static,
    {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        let deliveries = self
            .channel
            .subscribe(queue, self.settings.prefetch_count)
            .await?;

        let queue_name = queue.to_string();
        let closed = self.closed.clone();
        self.workers
            .spawn(drain(queue_name, deliveries, handler, cancel, closed));

        tracing::info!(queue, backend = RABBITMQ, "consumer started");
        Ok(())
    }
}

async fn drain<M>(
    queue: String,
    mut deliveries: DeliveryStream,
    handler: Arc<dyn MessageHandler<M>>,
    cancel: CancellationToken,
    closed: CancellationToken,
) where
    M: DeserializeOwned + Send + 'static,
{
    let queue = queue.as_str();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = closed.cancelled() => break,
            next = deliveries.next() => next,
        };

        let Some(delivery) = next else {
            tracing::warn!(queue, "subscription closed by broker");
            break;
        };

        let disposition = dispatch(queue, &delivery.body, handler.as_ref()).await;
        let settled = match disposition {
            Disposition::Ack => delivery.ack().await,
            Disposition::Discard => delivery.nack(false).await,
            Disposition::Requeue => delivery.nack(true).await,
        };
        if let Err(e) = settled {
            tracing::warn!(queue, delivery_tag = delivery.delivery_tag, ?disposition, error = %e, "failed to settle delivery");
        }
    }

    tracing::info!(queue, "consumer stopped");
}

#[async_trait]
impl<C: ChannelClient> MessageBroker for RabbitMqBroker<C> {
    fn backend(&self) -> &'static str {
        RABBITMQ
    }

    async fn consume_order_updates(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<OrderUpdateMessage>>,
    ) -> Result<()> {
        let queue = self.settings.order_updates_queue.clone();
        self.start_worker(&queue, cancel, handler).await
    }

    async fn consume_payment_confirmations(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<PaymentConfirmationMessage>>,
    ) -> Result<()> {
        let queue = self.settings.payment_confirmations_queue.clone();
        self.start_worker(&queue, cancel, handler).await
    }

    async fn consume_order_errors(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<OrderErrorMessage>>,
    ) -> Result<()> {
        let queue = self.settings.order_error_queue.clone();
        self.start_worker(&queue, cancel, handler).await
    }

    #[tracing::instrument(skip(self, notification), fields(order_id = %notification.order_id))]
    async fn send_to_kitchen(&self, notification: &KitchenNotification) -> Result<()> {
        let body = message::encode(notification)?;
        self.publish_on_topic(&self.settings.kitchen_queue, &body)
            .await
    }

    async fn publish_on_topic(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(BrokerError::Closed);
        }
        self.channel.publish(topic, payload).await?;
        tracing::debug!(routing_key = %topic, bytes = payload.len(), "message published");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        self.closed.cancel();
        self.workers.close();
        self.channel.close().await?;
        tracing::info!(backend = RABBITMQ, "broker closed");
        Ok(())
    }

    async fn shutdown(&self) {
        self.workers.close();
        self.workers.wait().await;
    }
}
