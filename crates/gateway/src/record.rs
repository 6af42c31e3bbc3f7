//! Storage-agnostic record shapes and their mapping to the aggregate.

use chrono::{DateTime, Utc};
use common::{CustomerId, ItemId, OrderId, StatusId};
use domain::{
    Amount, Money, Order, OrderItem, OrderParts, OrderStatus, ProductId, Quantity, UnitPrice,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Persisted form of an order status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusRecord {
    pub id: String,
    pub name: String,
}

/// Persisted form of an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

/// Persisted form of an order with its status preloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub customer_id: Option<String>,
    pub amount_cents: i64,
    pub status: OrderStatusRecord,
    pub items: Vec<OrderItemRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl From<&OrderStatus> for OrderStatusRecord {
    fn from(status: &OrderStatus) -> Self {
        Self {
            id: status.id().to_string(),
            name: status.name().to_string(),
        }
    }
}

impl TryFrom<OrderStatusRecord> for OrderStatus {
    type Error = ValidationError;

    fn try_from(record: OrderStatusRecord) -> Result<Self, Self::Error> {
        OrderStatus::new(StatusId::from(record.id), record.name)
    }
}

impl From<&OrderItem> for OrderItemRecord {
    fn from(item: &OrderItem) -> Self {
        Self {
            id: item.id().to_string(),
            order_id: item.order_id().to_string(),
            product_id: item.product_id().to_string(),
            quantity: item.quantity().value(),
            unit_price_cents: item.unit_price().money().cents(),
        }
    }
}

impl TryFrom<OrderItemRecord> for OrderItem {
    type Error = ValidationError;

    fn try_from(record: OrderItemRecord) -> Result<Self, Self::Error> {
        Ok(OrderItem::new(
            ItemId::from(record.id),
            OrderId::from(record.order_id),
            ProductId::new(record.product_id)?,
            Quantity::new(record.quantity)?,
            UnitPrice::new(Money::from_cents(record.unit_price_cents))?,
        ))
    }
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().map(ToString::to_string),
            amount_cents: order.amount().money().cents(),
            status: order.status().into(),
            items: order.items().iter().map(OrderItemRecord::from).collect(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            version: order.version(),
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = ValidationError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let items = record
            .items
            .into_iter()
            .map(OrderItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Order::restore(OrderParts {
            id: OrderId::from(record.id),
            customer_id: record.customer_id.map(CustomerId::from),
            amount: Amount::new(Money::from_cents(record.amount_cents))?,
            status: record.status.try_into()?,
            items,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        let id = OrderId::new("O1");
        let items = vec![
            OrderItem::try_new(id.clone(), "SKU-001", 2, Money::from_cents(1000)).unwrap(),
            OrderItem::try_new(id.clone(), "SKU-002", 1, Money::from_cents(500)).unwrap(),
        ];
        Order::new(
            id,
            Some(CustomerId::new("C1")),
            OrderStatus::new("pending", "pending").unwrap(),
            items,
        )
        .unwrap()
    }

    #[test]
    fn record_preserves_aggregate() {
        let order = sample_order();
        let record = OrderRecord::from(&order);

        assert_eq!(record.amount_cents, 2500);
        assert_eq!(record.status.name, "pending");
        assert_eq!(record.items.len(), 2);

        let restored = Order::try_from(record).unwrap();
        assert_eq!(restored, order);
    }

    #[test]
    fn corrupt_record_is_rejected() {
        let mut record = OrderRecord::from(&sample_order());
        record.items[0].quantity = 0;
        assert!(matches!(
            Order::try_from(record),
            Err(ValidationError::InvalidQuantity { quantity: 0 })
        ));

        let mut record = OrderRecord::from(&sample_order());
        record.status.name = "x".to_string();
        assert!(matches!(
            Order::try_from(record),
            Err(ValidationError::InvalidName { .. })
        ));
    }
}
