use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    KitchenNotification, MessageHandler, OrderErrorMessage, OrderUpdateMessage,
    PaymentConfirmationMessage, Result,
};

/// Backend-neutral contract between consumers and a queue technology.
///
/// The `consume_*` methods register a handler and start a background worker
/// for the corresponding queue. They return once the worker is running, or an
/// error if the subscription could not be established. Workers stop when the
/// token is cancelled, when the broker is closed, or when the backend ends the
/// subscription.
///
/// Every successful handler call leads to the message being acknowledged.
/// Failed calls are classified with [`crate::classify`]; discarded messages
/// are removed without redelivery and everything else is made available
/// again.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Short name of the backend, e.g. `sqs` or `rabbitmq`.
    fn backend(&self) -> &'static str;

    async fn consume_order_updates(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<OrderUpdateMessage>>,
    ) -> Result<()>;

    async fn consume_payment_confirmations(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<PaymentConfirmationMessage>>,
    ) -> Result<()>;

    async fn consume_order_errors(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler<OrderErrorMessage>>,
    ) -> Result<()>;

    /// Publishes a paid-order notification on the kitchen destination.
    async fn send_to_kitchen(&self, notification: &KitchenNotification) -> Result<()>;

    /// Publishes a raw payload on an arbitrary destination. The topic is a
    /// queue URL for long-poll backends and a routing key for push backends.
    async fn publish_on_topic(&self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Stops accepting new work and releases the underlying connection.
    /// Safe to call more than once.
    async fn close(&self) -> Result<()>;

    /// Waits for every worker started by this broker to exit.
    ///
    /// Workers exit on cancellation or close; call one of those first.
    async fn shutdown(&self);
}
