//! Domain validation errors.

use common::{ItemId, OrderId};
use thiserror::Error;

use crate::order::Money;

/// Errors raised when constructing aggregates or value objects from invalid input.
///
/// Construction fails fast: a value object either exists in a valid state or
/// not at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An order must carry an identifier.
    #[error("order ID is required")]
    OrderIdRequired,

    /// Product identifiers cannot be blank.
    #[error("product ID must not be empty")]
    EmptyProductId,

    /// Quantity must be a positive integer.
    #[error("invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Unit price must be positive.
    #[error("invalid unit price: {price} (must be greater than 0)")]
    InvalidUnitPrice { price: Money },

    /// Order amount must be positive.
    #[error("invalid amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: Money },

    /// Names are limited to 3..=100 characters.
    #[error("invalid name '{name}': must be between {min} and {max} characters")]
    InvalidName {
        name: String,
        min: usize,
        max: usize,
    },

    /// The amount of an order cannot be computed without items.
    #[error("order has no items")]
    NoItems,

    /// An item was attached to a different order than the one being built.
    #[error("item {item_id} belongs to order {actual}, expected {expected}")]
    ItemOrderMismatch {
        item_id: ItemId,
        expected: OrderId,
        actual: OrderId,
    },
}
