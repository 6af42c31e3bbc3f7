use common::OrderId;
use domain::Order;
use gateway::{GatewayError, OrderGateway, OrderStatusGateway};

use crate::error::{Result, UseCaseError};
use crate::usecase::MAX_UPDATE_ATTEMPTS;

/// Applies an externally named status to an order.
///
/// Any status the status gateway can resolve by name is accepted; there is
/// no lifecycle check on this path.
pub struct UpdateOrderStatusUseCase<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    orders: G,
    statuses: S,
}

impl<G, S> UpdateOrderStatusUseCase<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    pub fn new(orders: G, statuses: S) -> Self {
        Self { orders, statuses }
    }

    /// Loads the order, resolves the status by name and saves the change.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, order_id: &str, status_name: &str) -> Result<Order> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(UseCaseError::InvalidOrderId(order_id.to_string()));
        }
        let order_id = OrderId::new(order_id);

        let mut attempt = 1;
        loop {
            let mut order =
                self.orders
                    .find_by_id(&order_id)
                    .await
                    .map_err(|source| UseCaseError::FindOrder {
                        order_id: order_id.to_string(),
                        source,
                    })?;

            let status = self.statuses.find_by_name(status_name).await.map_err(|source| {
                UseCaseError::FindStatus {
                    name: status_name.to_string(),
                    source,
                }
            })?;

            let previous = order.status().name().as_str().to_string();
            order.change_status(status);

            match self.orders.update(&order).await {
                Ok(saved) => {
                    tracing::info!(from = %previous, to = %saved.status().name(), "order status updated");
                    return Ok(saved);
                }
                Err(GatewayError::VersionConflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                    tracing::warn!(attempt, "order changed concurrently, reloading");
                    attempt += 1;
                }
                Err(source) => {
                    return Err(UseCaseError::UpdateOrder {
                        order_id: order_id.to_string(),
                        source,
                    });
                }
            }
        }
    }
}
