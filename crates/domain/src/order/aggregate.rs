//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use super::{Amount, OrderItem, OrderState, OrderStatus};
use crate::error::ValidationError;

/// Order aggregate root.
///
/// The order and its items form one consistency unit. Status transitions
/// mutate the aggregate in place; persistence is all-or-nothing per gateway
/// call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,

    customer_id: Option<CustomerId>,

    /// Sum of item totals, fixed at creation.
    amount: Amount,

    status: OrderStatus,

    items: Vec<OrderItem>,

    created_at: DateTime<Utc>,

    updated_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency token. Zero until first persisted.
    #[serde(default)]
    version: u64,
}

/// Raw parts used to rebuild an order from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub customer_id: Option<CustomerId>,
    pub amount: Amount,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Order {
    /// Creates a new order, deriving its amount from the items.
    ///
    /// Fails if the ID is blank, there are no items, or an item references a
    /// different order.
    pub fn new(
        id: OrderId,
        customer_id: Option<CustomerId>,
        status: OrderStatus,
        items: Vec<OrderItem>,
    ) -> Result<Self, ValidationError> {
        if id.is_blank() {
            return Err(ValidationError::OrderIdRequired);
        }
        if let Some(item) = items.iter().find(|item| item.order_id() != &id) {
            return Err(ValidationError::ItemOrderMismatch {
                item_id: item.id().clone(),
                expected: id,
                actual: item.order_id().clone(),
            });
        }
        let amount = Amount::from_items(&items)?;

        Ok(Self {
            id,
            customer_id,
            amount,
            status,
            items,
            created_at: Utc::now(),
            updated_at: None,
            version: 0,
        })
    }

    /// Rebuilds an order from persisted parts without recomputing the amount.
    pub fn restore(parts: OrderParts) -> Result<Self, ValidationError> {
        if parts.id.is_blank() {
            return Err(ValidationError::OrderIdRequired);
        }
        Ok(Self {
            id: parts.id,
            customer_id: parts.customer_id,
            amount: parts.amount,
            status: parts.status,
            items: parts.items,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            version: parts.version,
        })
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn customer_id(&self) -> Option<&CustomerId> {
        self.customer_id.as_ref()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn status(&self) -> &OrderStatus {
        &self.status
    }

    /// Returns the lifecycle state derived from the current status name.
    pub fn state(&self) -> OrderState {
        self.status.state()
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets the persisted version. Called by gateways after a successful write.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Replaces the current status and stamps `updated_at`.
    pub fn change_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Some(Utc::now());
    }

    /// Returns true if the order is in a terminal lifecycle state.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Money, status_names};

    fn pending() -> OrderStatus {
        OrderStatus::new(status_names::PENDING, status_names::PENDING).unwrap()
    }

    fn item(order_id: &OrderId, sku: &str, qty: u32, cents: i64) -> OrderItem {
        OrderItem::try_new(order_id.clone(), sku, qty, Money::from_cents(cents)).unwrap()
    }

    #[test]
    fn test_amount_is_sum_of_item_totals() {
        let id = OrderId::new("O1");
        let items = vec![item(&id, "SKU-001", 2, 1000), item(&id, "SKU-002", 1, 500)];
        let order = Order::new(id, None, pending(), items).unwrap();

        assert_eq!(order.amount().money().cents(), 2500);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.version(), 0);
        assert!(order.updated_at().is_none());
    }

    #[test]
    fn test_order_without_items_fails() {
        let result = Order::new(OrderId::new("O1"), None, pending(), vec![]);
        assert_eq!(result.unwrap_err(), ValidationError::NoItems);
    }

    #[test]
    fn test_blank_id_fails() {
        let id = OrderId::new(" ");
        let items = vec![item(&id, "SKU-001", 1, 100)];
        let result = Order::new(id, None, pending(), items);
        assert_eq!(result.unwrap_err(), ValidationError::OrderIdRequired);
    }

    #[test]
    fn test_item_from_other_order_fails() {
        let other = OrderId::new("O2");
        let items = vec![item(&other, "SKU-001", 1, 100)];
        let result = Order::new(OrderId::new("O1"), None, pending(), items);
        assert!(matches!(
            result,
            Err(ValidationError::ItemOrderMismatch { .. })
        ));
    }

    #[test]
    fn test_change_status_updates_timestamp_and_state() {
        let id = OrderId::new("O1");
        let items = vec![item(&id, "SKU-001", 1, 100)];
        let mut order = Order::new(id, None, pending(), items).unwrap();
        assert_eq!(order.state(), OrderState::Pending);

        order.change_status(OrderStatus::new("paid", "paid").unwrap());

        assert_eq!(order.state(), OrderState::Paid);
        assert!(order.is_terminal());
        assert!(order.updated_at().is_some());
    }
}
