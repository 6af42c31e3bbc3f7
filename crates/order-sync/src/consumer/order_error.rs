use std::sync::Arc;

use async_trait::async_trait;
use broker::{CancellationToken, HandlerError, MessageBroker, MessageHandler, OrderErrorMessage};
use common::OrderId;
use gateway::OrderGateway;

use crate::error::UseCaseError;

/// Removes orders that failed validation upstream after being created.
pub struct OrderErrorConsumer<G: OrderGateway> {
    broker: Arc<dyn MessageBroker>,
    orders: G,
}

impl<G: OrderGateway + 'static> OrderErrorConsumer<G> {
    pub fn new(broker: Arc<dyn MessageBroker>, orders: G) -> Self {
        Self { broker, orders }
    }

    /// Subscribes to the order errors queue. Returns once the worker runs.
    pub async fn start(self: Arc<Self>, cancel: CancellationToken) -> broker::Result<()> {
        let broker = Arc::clone(&self.broker);
        broker.consume_order_errors(cancel, self).await
    }
}

#[async_trait]
impl<G: OrderGateway> MessageHandler<OrderErrorMessage> for OrderErrorConsumer<G> {
    async fn handle(&self, message: OrderErrorMessage) -> Result<(), HandlerError> {
        let order_id = message.order_id.trim();
        if order_id.is_empty() {
            return Err(UseCaseError::InvalidOrderId(message.order_id).into());
        }

        self.orders
            .delete(&OrderId::new(order_id))
            .await
            .map_err(|source| UseCaseError::DeleteOrder {
                order_id: order_id.to_string(),
                source,
            })?;

        tracing::info!(order_id, reason = %message.reason, "order removed after upstream error");
        Ok(())
    }
}
