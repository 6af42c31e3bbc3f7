//! Message consumers.
//!
//! Each consumer is the [`broker::MessageHandler`] for one queue. `start`
//! registers it with its broker; a handler error goes back to the broker,
//! which discards or requeues the message based on the error kind.

mod order_error;
mod order_updates;
mod payment;

pub use order_error::OrderErrorConsumer;
pub use order_updates::OrderUpdatesConsumer;
pub use payment::{PaymentConsumer, kitchen_notification};
