use std::sync::Arc;

use async_trait::async_trait;
use broker::{
    CancellationToken, HandlerError, KitchenItem, KitchenNotification, MessageBroker,
    MessageHandler, PaymentConfirmationMessage,
};
use chrono::{DateTime, Utc};
use domain::{Order, status_names};
use gateway::{OrderGateway, OrderStatusGateway};

use crate::usecase::{PaymentConfirmation, ProcessPaymentConfirmationUseCase, StatusFallback};

/// Applies payment results and tells the kitchen about paid orders.
///
/// The kitchen notification goes out through its own broker handle and is
/// best-effort: once the payment is saved, a failed publish is only logged.
pub struct PaymentConsumer<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    broker: Arc<dyn MessageBroker>,
    kitchen: Arc<dyn MessageBroker>,
    use_case: ProcessPaymentConfirmationUseCase<G, S>,
}

impl<G, S> PaymentConsumer<G, S>
where
    G: OrderGateway + 'static,
    S: OrderStatusGateway + 'static,
{
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        kitchen: Arc<dyn MessageBroker>,
        orders: G,
        statuses: S,
    ) -> Self {
        Self {
            broker,
            kitchen,
            use_case: ProcessPaymentConfirmationUseCase::new(orders, statuses),
        }
    }

    pub fn with_status_fallback(mut self, fallback: StatusFallback) -> Self {
        self.use_case = self.use_case.with_status_fallback(fallback);
        self
    }

    /// Subscribes to the payment confirmations queue. Returns once the
    /// worker runs.
    pub async fn start(self: Arc<Self>, cancel: CancellationToken) -> broker::Result<()> {
        let broker = Arc::clone(&self.broker);
        broker.consume_payment_confirmations(cancel, self).await
    }
}

impl From<PaymentConfirmationMessage> for PaymentConfirmation {
    fn from(message: PaymentConfirmationMessage) -> Self {
        Self {
            order_id: message.order_id,
            payment_id: message.payment_id,
            amount: message.amount,
            status: message.status,
            payment_method: message.payment_method,
            processed_at: message.processed_at,
        }
    }
}

/// Builds the kitchen notification for a paid order.
pub fn kitchen_notification(
    order: &Order,
    payment_method: &str,
    paid_at: DateTime<Utc>,
) -> KitchenNotification {
    KitchenNotification {
        message_type: KitchenNotification::ORDER_PAID.to_string(),
        order_id: order.id().to_string(),
        customer_id: order.customer_id().map(ToString::to_string),
        items: order
            .items()
            .iter()
            .map(|item| KitchenItem {
                product_id: item.product_id().as_str().to_string(),
                quantity: item.quantity().value(),
                unit_price: item.unit_price().money().as_major(),
            })
            .collect(),
        status: status_names::PAID.to_string(),
        created_at: order.created_at(),
        paid_at,
        total_amount: order.amount().money().as_major(),
        payment_method: payment_method.to_string(),
    }
}

#[async_trait]
impl<G, S> MessageHandler<PaymentConfirmationMessage> for PaymentConsumer<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    async fn handle(&self, message: PaymentConfirmationMessage) -> Result<(), HandlerError> {
        let input = PaymentConfirmation::from(message);
        let outcome = self.use_case.execute(&input).await?;

        if !outcome.status_changed {
            tracing::info!(order_id = %outcome.order_id, reason = %outcome.message, "payment confirmation acknowledged without change");
            return Ok(());
        }

        if let (true, Some(order)) = (outcome.should_notify_kitchen, outcome.order.as_ref()) {
            let notification = kitchen_notification(
                order,
                input.payment_method.as_deref().unwrap_or_default(),
                input.processed_at.unwrap_or_else(Utc::now),
            );
            if let Err(e) = self.kitchen.send_to_kitchen(&notification).await {
                metrics::counter!("kitchen_notifications_failed_total").increment(1);
                tracing::error!(order_id = %outcome.order_id, error = %e, "failed to notify kitchen");
            }
        }

        tracing::info!(order_id = %outcome.order_id, status = %outcome.new_status, "payment confirmation processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{CustomerId, OrderId};
    use domain::{Money, OrderItem, OrderStatus};

    use super::*;

    #[test]
    fn notification_mirrors_the_order() {
        let id = OrderId::new("O1");
        let items = vec![
            OrderItem::try_new(id.clone(), "SKU-1", 2, Money::from_cents(1000)).unwrap(),
            OrderItem::try_new(id.clone(), "SKU-2", 1, Money::from_cents(550)).unwrap(),
        ];
        let order = Order::new(
            id,
            Some(CustomerId::new("C1")),
            OrderStatus::new("paid", "paid").unwrap(),
            items,
        )
        .unwrap();
        let paid_at = Utc::now();

        let note = kitchen_notification(&order, "card", paid_at);

        assert_eq!(note.message_type, "order_paid");
        assert_eq!(note.order_id, "O1");
        assert_eq!(note.customer_id.as_deref(), Some("C1"));
        assert_eq!(note.items.len(), 2);
        assert_eq!(note.items[1].unit_price, 5.5);
        assert_eq!(note.total_amount, 25.5);
        assert_eq!(note.status, "paid");
        assert_eq!(note.paid_at, paid_at);
        assert_eq!(note.created_at, order.created_at());
    }

    #[test]
    fn confirmation_from_message() {
        let message: PaymentConfirmationMessage = serde_json::from_str(
            r#"{"type":"payment","order_id":"O1","payment_id":"P1","amount":25.0,"status":"confirmed"}"#,
        )
        .unwrap();
        let input = PaymentConfirmation::from(message);

        assert_eq!(input.order_id, "O1");
        assert_eq!(input.amount, 25.0);
        assert!(input.payment_method.is_none());
        assert!(input.validate().is_ok());
    }
}
