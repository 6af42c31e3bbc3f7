//! Order synchronization with upstream systems.
//!
//! This crate turns inbound broker messages into order state changes:
//! - Order updates set an order's status by its human-readable name
//! - Payment confirmations drive the payment lifecycle and notify the kitchen
//! - Order errors delete orders that failed upstream validation
//!
//! Business outcomes such as a disallowed transition are successful results.
//! Only faults become errors, and each carries the kind the broker uses to
//! decide between discarding and requeueing the message.

pub mod consumer;
pub mod error;
pub mod usecase;

pub use consumer::{OrderErrorConsumer, OrderUpdatesConsumer, PaymentConsumer, kitchen_notification};
pub use error::{Result, UseCaseError};
pub use usecase::{
    PaymentConfirmation, PaymentConfirmationOutcome, ProcessPaymentConfirmationUseCase,
    StatusFallback, UpdateOrderStatusUseCase,
};
