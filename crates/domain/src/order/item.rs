//! Order line items.

use common::{ItemId, OrderId};
use serde::{Deserialize, Serialize};

use super::{Money, ProductId, Quantity, UnitPrice};
use crate::error::ValidationError;

/// A single line of an order.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    id: ItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: Quantity,
    unit_price: UnitPrice,
}

impl OrderItem {
    /// Creates an item from already validated parts.
    pub fn new(
        id: ItemId,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
        unit_price: UnitPrice,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            quantity,
            unit_price,
        }
    }

    /// Validates raw input and creates an item with a fresh identifier.
    pub fn try_new(
        order_id: OrderId,
        product_id: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(
            ItemId::generate(),
            order_id,
            ProductId::new(product_id)?,
            Quantity::new(quantity)?,
            UnitPrice::new(unit_price)?,
        ))
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> UnitPrice {
        self.unit_price
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.money().multiply(self.quantity.value())
    }
}
