//! Domain layer for the order synchronization subsystem.
//!
//! This crate provides:
//! - The `Order` aggregate with its items and current status
//! - Validated value objects (`Amount`, `Quantity`, `UnitPrice`, `ProductId`, `Name`)
//! - The payment lifecycle state machine derived from status names

pub mod error;
pub mod order;

pub use error::ValidationError;
pub use order::{
    Amount, Money, Name, Order, OrderItem, OrderParts, OrderState, OrderStatus, PaymentOutcome,
    ProductId, Quantity, UnitPrice, status_names,
};
