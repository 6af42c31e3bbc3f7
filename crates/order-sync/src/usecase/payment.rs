//! Payment confirmation state machine.

use chrono::{DateTime, Utc};
use common::{OrderId, StatusId};
use domain::{Order, OrderStatus, PaymentOutcome};
use gateway::{GatewayError, OrderGateway, OrderStatusGateway};

use crate::error::{Result, UseCaseError};
use crate::usecase::MAX_UPDATE_ATTEMPTS;

/// What to do when a target status is missing from the status gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFallback {
    /// Continue with an unsaved status built from the name. Logged and
    /// counted so missing seed data shows up.
    #[default]
    Transient,
    /// Fail with a not-found error.
    Reject,
}

impl StatusFallback {
    /// Parses `transient` or `reject` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "transient" => Some(StatusFallback::Transient),
            "reject" => Some(StatusFallback::Reject),
            _ => None,
        }
    }
}

/// A payment processor result, as received.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub amount: f64,
    pub status: String,
    pub payment_method: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl PaymentConfirmation {
    /// Checks the fields that must be present before touching storage.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.order_id.trim().is_empty() {
            return Err("order ID is required".to_string());
        }
        if self.payment_id.trim().is_empty() {
            return Err("payment ID is required".to_string());
        }
        if self.status.trim().is_empty() {
            return Err("payment status is required".to_string());
        }
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(format!("amount must be greater than 0, got {}", self.amount));
        }
        Ok(())
    }
}

/// Result of applying a payment confirmation.
///
/// Disallowed transitions and unknown payment statuses are reported here
/// with `status_changed == false`, never as errors.
#[derive(Debug, Clone)]
pub struct PaymentConfirmationOutcome {
    pub order_id: OrderId,
    pub previous_status: String,
    pub new_status: String,
    pub status_changed: bool,
    pub should_notify_kitchen: bool,
    pub message: String,

    /// The persisted order after a status change.
    pub order: Option<Order>,
}

impl PaymentConfirmationOutcome {
    fn unchanged(order: &Order, message: String) -> Self {
        let status = order.status().name().as_str().to_string();
        Self {
            order_id: order.id().clone(),
            previous_status: status.clone(),
            new_status: status,
            status_changed: false,
            should_notify_kitchen: false,
            message,
            order: None,
        }
    }
}

/// Applies payment results to orders.
///
/// ```text
/// pending / created ── confirmed ──────────► paid   (notify kitchen)
///                   └─ failed / cancelled ─► failed
/// ```
/// Orders in any other status are left untouched.
pub struct ProcessPaymentConfirmationUseCase<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    orders: G,
    statuses: S,
    fallback: StatusFallback,
}

impl<G, S> ProcessPaymentConfirmationUseCase<G, S>
where
    G: OrderGateway,
    S: OrderStatusGateway,
{
    pub fn new(orders: G, statuses: S) -> Self {
        Self {
            orders,
            statuses,
            fallback: StatusFallback::default(),
        }
    }

    pub fn with_status_fallback(mut self, fallback: StatusFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Validates the confirmation and moves the order along the payment
    /// lifecycle. Version conflicts are retried with a fresh load.
    #[tracing::instrument(skip(self, input), fields(order_id = %input.order_id, payment_id = %input.payment_id))]
    pub async fn execute(&self, input: &PaymentConfirmation) -> Result<PaymentConfirmationOutcome> {
        input.validate().map_err(UseCaseError::InvalidPayment)?;
        let order_id = OrderId::new(input.order_id.trim());
        let requested = PaymentOutcome::parse(&input.status);

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

            let state = order.state();
            let previous = order.status().name().as_str().to_string();

            let outcome = match requested {
                Some(outcome) if state.accepts(outcome) => outcome,
                None if state.can_accept_payment() => {
                    metrics::counter!("payment_confirmations_total", "outcome" => "unrecognized")
                        .increment(1);
                    tracing::warn!(payment_status = %input.status, "unrecognized payment status");
                    return Ok(PaymentConfirmationOutcome::unchanged(
                        &order,
                        format!("unrecognized payment status '{}'", input.status),
                    ));
                }
                _ => {
                    metrics::counter!("payment_confirmations_total", "outcome" => "ignored")
                        .increment(1);
                    tracing::info!(status = %previous, payment_status = %input.status, "order cannot accept payment, ignoring");
                    return Ok(PaymentConfirmationOutcome::unchanged(
                        &order,
                        format!(
                            "order {order_id} is in status '{previous}' and cannot accept payment status '{}'",
                            input.status
                        ),
                    ));
                }
            };

            let target = self.find_or_create_status(outcome.target_status()).await?;
            order.change_status(target);

            match self.orders.update(&order).await {
                Ok(saved) => {
                    let new_status = saved.status().name().as_str().to_string();
                    metrics::counter!("payment_confirmations_total", "outcome" => outcome.target_status())
                        .increment(1);
                    tracing::info!(from = %previous, to = %new_status, "order payment status applied");

                    return Ok(PaymentConfirmationOutcome {
                        order_id: order_id.clone(),
                        message: format!(
                            "order {order_id} status changed from '{previous}' to '{new_status}'"
                        ),
                        previous_status: previous,
                        new_status,
                        status_changed: true,
                        should_notify_kitchen: outcome.notifies_kitchen(),
                        order: Some(saved),
                    });
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

    /// Resolves a status by ID, applying the fallback policy when it is
    /// missing.
    async fn find_or_create_status(&self, name: &str) -> Result<OrderStatus> {
        let id = StatusId::new(name);
        match self.statuses.find_by_id(&id).await {
            Ok(status) => Ok(status),
            Err(source) if source.is_not_found() => match self.fallback {
                StatusFallback::Transient => {
                    tracing::warn!(status = name, "status missing from storage, using unsaved status");
                    metrics::counter!("order_status_fallback_total", "status" => name.to_string())
                        .increment(1);
                    Ok(OrderStatus::new(id, name)?)
                }
                StatusFallback::Reject => Err(UseCaseError::FindStatus {
                    name: name.to_string(),
                    source,
                }),
            },
            Err(source) => Err(UseCaseError::FindStatus {
                name: name.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::CustomerId;
    use domain::OrderItem;
    use gateway::{InMemoryOrderGateway, InMemoryOrderStatusGateway};

    use domain::Money;

    use super::*;

    fn confirmation(order_id: &str, status: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: order_id.to_string(),
            payment_id: "P1".to_string(),
            amount: 25.0,
            status: status.to_string(),
            payment_method: Some("card".to_string()),
            processed_at: None,
        }
    }

    async fn seed(orders: &InMemoryOrderGateway, id: &str, status: &str) {
        let order_id = OrderId::new(id);
        let item = OrderItem::try_new(order_id.clone(), "SKU-1", 1, Money::from_cents(2500)).unwrap();
        let order = Order::new(
            order_id,
            Some(CustomerId::new("C1")),
            OrderStatus::new(status, status).unwrap(),
            vec![item],
        )
        .unwrap();
        orders.create(&order).await.unwrap();
    }

    fn use_case(
        orders: &InMemoryOrderGateway,
    ) -> ProcessPaymentConfirmationUseCase<InMemoryOrderGateway, InMemoryOrderStatusGateway> {
        ProcessPaymentConfirmationUseCase::new(
            orders.clone(),
            InMemoryOrderStatusGateway::with_defaults(),
        )
    }

    #[test]
    fn validation_messages() {
        let cases = [
            (confirmation("", "confirmed"), "order ID is required"),
            (
                PaymentConfirmation {
                    payment_id: " ".to_string(),
                    ..confirmation("O1", "confirmed")
                },
                "payment ID is required",
            ),
            (confirmation("O1", ""), "payment status is required"),
            (
                PaymentConfirmation {
                    amount: 0.0,
                    ..confirmation("O1", "confirmed")
                },
                "amount must be greater than 0",
            ),
            (
                PaymentConfirmation {
                    amount: f64::NAN,
                    ..confirmation("O1", "confirmed")
                },
                "amount must be greater than 0",
            ),
        ];

        for (input, expected) in cases {
            let reason = input.validate().unwrap_err();
            assert!(reason.contains(expected), "{reason}");
        }
    }

    #[test]
    fn sub_cent_amounts_are_positive() {
        let input = PaymentConfirmation {
            amount: 0.004,
            ..confirmation("O1", "confirmed")
        };
        assert!(input.validate().is_ok());

        let negative = PaymentConfirmation {
            amount: -0.004,
            ..confirmation("O1", "confirmed")
        };
        assert!(negative.validate().is_err());
    }

    #[tokio::test]
    async fn invalid_input_never_touches_storage() {
        let orders = InMemoryOrderGateway::new();
        orders.set_unavailable(true).await;

        let err = use_case(&orders)
            .execute(&confirmation("O1", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidPayment(_)));
        assert_eq!(
            err.to_string(),
            "Invalid payment confirmation: payment status is required"
        );
    }

    #[tokio::test]
    async fn every_non_terminal_state_accepts_every_outcome() {
        for current in ["pending", "created"] {
            for (incoming, target, notify) in [
                ("confirmed", "paid", true),
                ("failed", "failed", false),
                ("cancelled", "failed", false),
                ("CONFIRMED", "paid", true),
            ] {
                let orders = InMemoryOrderGateway::new();
                seed(&orders, "O1", current).await;

                let out = use_case(&orders)
                    .execute(&confirmation("O1", incoming))
                    .await
                    .unwrap();

                assert!(out.status_changed, "{current} + {incoming}");
                assert_eq!(out.previous_status, current);
                assert_eq!(out.new_status, target);
                assert_eq!(out.should_notify_kitchen, notify);

                let stored = orders.find_by_id(&OrderId::new("O1")).await.unwrap();
                assert_eq!(stored.status().name().as_str(), target);
            }
        }
    }

    #[tokio::test]
    async fn terminal_states_are_left_alone() {
        for current in ["paid", "failed", "cancelled", "shipped"] {
            for incoming in ["confirmed", "failed", "cancelled", "refunded"] {
                let orders = InMemoryOrderGateway::new();
                seed(&orders, "O1", current).await;

                let out = use_case(&orders)
                    .execute(&confirmation("O1", incoming))
                    .await
                    .unwrap();

                assert!(!out.status_changed);
                assert!(!out.should_notify_kitchen);
                assert_eq!(out.new_status, current);
                assert_eq!(orders.update_calls().await, 0);
            }
        }
    }

    #[tokio::test]
    async fn unrecognized_status_is_a_business_outcome() {
        let orders = InMemoryOrderGateway::new();
        seed(&orders, "O1", "pending").await;

        let out = use_case(&orders)
            .execute(&confirmation("O1", "refunded"))
            .await
            .unwrap();

        assert!(!out.status_changed);
        assert!(out.message.contains("unrecognized payment status 'refunded'"));
        assert_eq!(orders.update_calls().await, 0);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let orders = InMemoryOrderGateway::new();
        let err = use_case(&orders)
            .execute(&confirmation("O404", "confirmed"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), broker::ErrorKind::NotFound);
        assert!(err.to_string().contains("Order not found"));
    }

    #[tokio::test]
    async fn missing_status_follows_fallback_policy() {
        let orders = InMemoryOrderGateway::new();
        seed(&orders, "O1", "pending").await;
        seed(&orders, "O2", "pending").await;

        let lenient =
            ProcessPaymentConfirmationUseCase::new(orders.clone(), InMemoryOrderStatusGateway::new());
        let out = lenient.execute(&confirmation("O1", "confirmed")).await.unwrap();
        assert!(out.status_changed);
        assert_eq!(out.new_status, "paid");

        let strict =
            ProcessPaymentConfirmationUseCase::new(orders.clone(), InMemoryOrderStatusGateway::new())
                .with_status_fallback(StatusFallback::Reject);
        let err = strict
            .execute(&confirmation("O2", "confirmed"))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::FindStatus { .. }));
        assert_eq!(err.kind(), broker::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn storage_outage_is_retryable() {
        let orders = InMemoryOrderGateway::new();
        seed(&orders, "O1", "pending").await;
        orders.set_unavailable(true).await;

        let err = use_case(&orders)
            .execute(&confirmation("O1", "confirmed"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), broker::ErrorKind::Transient);
    }

    #[test]
    fn fallback_parsing() {
        assert_eq!(StatusFallback::parse("Reject"), Some(StatusFallback::Reject));
        assert_eq!(
            StatusFallback::parse(" transient "),
            Some(StatusFallback::Transient)
        );
        assert_eq!(StatusFallback::parse("ignore"), None);
    }
}
