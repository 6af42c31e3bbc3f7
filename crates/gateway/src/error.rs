use common::{OrderId, StatusId};
use domain::ValidationError;
use thiserror::Error;

/// Errors that can occur when interacting with a gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No order exists with the given ID.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No order status exists with the given ID.
    #[error("Order status not found: {0}")]
    StatusNotFound(StatusId),

    /// No order status exists with the given name.
    #[error("Order status not found with name '{0}'")]
    StatusNameNotFound(String),

    /// An order with the same ID is already stored.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),

    /// The stored version did not match the version the caller loaded.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        order_id: OrderId,
        expected: u64,
        actual: u64,
    },

    /// A stored record could not be turned back into a valid aggregate.
    #[error("Invalid stored record: {0}")]
    InvalidRecord(#[from] ValidationError),

    /// The backing store could not be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GatewayError::OrderNotFound(_)
                | GatewayError::StatusNotFound(_)
                | GatewayError::StatusNameNotFound(_)
        )
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
