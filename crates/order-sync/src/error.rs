//! Use case error types.

use broker::{ErrorKind, HandlerError};
use domain::ValidationError;
use gateway::GatewayError;
use thiserror::Error;

/// Errors that can occur while applying an inbound message.
///
/// The display text carries the operator-facing context; [`UseCaseError::kind`]
/// carries the retry policy.
#[derive(Debug, Error)]
pub enum UseCaseError {
    /// A payment confirmation failed input validation.
    #[error("Invalid payment confirmation: {0}")]
    InvalidPayment(String),

    /// The message named no usable order.
    #[error("Invalid order ID: '{0}'")]
    InvalidOrderId(String),

    /// Loading the order failed.
    #[error("failed to find order {order_id}: {source}")]
    FindOrder {
        order_id: String,
        source: GatewayError,
    },

    /// Resolving the target status failed.
    #[error("failed to find order status '{name}': {source}")]
    FindStatus { name: String, source: GatewayError },

    /// Persisting the updated order failed.
    #[error("failed to update order {order_id}: {source}")]
    UpdateOrder {
        order_id: String,
        source: GatewayError,
    },

    /// Deleting the order failed.
    #[error("failed to delete order {order_id}: {source}")]
    DeleteOrder {
        order_id: String,
        source: GatewayError,
    },

    /// A status value could not be built.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl UseCaseError {
    /// Classifies the error for the broker's retry policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UseCaseError::InvalidPayment(_)
            | UseCaseError::InvalidOrderId(_)
            | UseCaseError::Validation(_) => ErrorKind::InvalidInput,
            UseCaseError::FindOrder { source, .. }
            | UseCaseError::FindStatus { source, .. }
            | UseCaseError::UpdateOrder { source, .. }
            | UseCaseError::DeleteOrder { source, .. } => gateway_kind(source),
        }
    }
}

fn gateway_kind(error: &GatewayError) -> ErrorKind {
    match error {
        e if e.is_not_found() => ErrorKind::NotFound,
        GatewayError::VersionConflict { .. } => ErrorKind::Conflict,
        GatewayError::Unavailable(_) => ErrorKind::Transient,
        GatewayError::InvalidRecord(_) | GatewayError::AlreadyExists(_) => ErrorKind::Persistence,
        _ => ErrorKind::Unclassified,
    }
}

impl From<UseCaseError> for HandlerError {
    fn from(error: UseCaseError) -> Self {
        HandlerError::new(error.kind(), error)
    }
}

/// Convenience type alias for use case results.
pub type Result<T> = std::result::Result<T, UseCaseError>;
