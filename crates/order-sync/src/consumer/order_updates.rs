use std::sync::Arc;

use async_trait::async_trait;
use broker::{CancellationToken, HandlerError, MessageBroker, MessageHandler, OrderUpdateMessage};
use gateway::{OrderGateway, OrderStatusGateway};

use crate::usecase::UpdateOrderStatusUseCase;

/// Applies order status broadcasts from upstream systems.
pub struct OrderUpdatesConsumer<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    broker: Arc<dyn MessageBroker>,
    use_case: UpdateOrderStatusUseCase<G, S>,
}

impl<G, S> OrderUpdatesConsumer<G, S>
where
    G: OrderGateway + 'static,
    S: OrderStatusGateway + 'static,
{
    pub fn new(broker: Arc<dyn MessageBroker>, orders: G, statuses: S) -> Self {
        Self {
            broker,
            use_case: UpdateOrderStatusUseCase::new(orders, statuses),
        }
    }

    /// Subscribes to the order updates queue. Returns once the worker runs.
    pub async fn start(self: Arc<Self>, cancel: CancellationToken) -> broker::Result<()> {
        let broker = Arc::clone(&self.broker);
        broker.consume_order_updates(cancel, self).await
    }
}

#[async_trait]
impl<G, S> MessageHandler<OrderUpdateMessage> for OrderUpdatesConsumer<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    async fn handle(&self, message: OrderUpdateMessage) -> Result<(), HandlerError> {
        let order = self
            .use_case
            .execute(&message.order_id, &message.status)
            .await?;
        tracing::info!(order_id = %order.id(), status = %order.status().name(), "order update processed");
        Ok(())
    }
}
