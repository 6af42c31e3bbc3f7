//! Persistence gateways for orders and order statuses.
//!
//! Gateways translate between the `Order` aggregate and a storage-agnostic
//! record shape. Every call is all-or-nothing.

pub mod error;
pub mod filter;
pub mod gateway;
pub mod memory;
pub mod record;

pub use error::{GatewayError, Result};
pub use filter::OrderFilter;
pub use gateway::{OrderGateway, OrderStatusGateway};
pub use memory::{InMemoryOrderGateway, InMemoryOrderStatusGateway};
pub use record::{OrderItemRecord, OrderRecord, OrderStatusRecord};
