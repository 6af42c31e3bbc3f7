use thiserror::Error;

/// Errors raised by brokers, their factory and their transports.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The configured type tag has no registered backend.
    #[error("unsupported broker type: {0}")]
    UnsupportedBrokerType(String),

    /// A backend parameter required before connecting is missing.
    #[error("missing required broker parameter: {0}")]
    MissingParameter(&'static str),

    /// A backend parameter is present but unusable.
    #[error("invalid broker parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The connection to the backend could not be established.
    #[error("failed to connect to {backend}: {reason}")]
    Connection {
        backend: &'static str,
        reason: String,
    },

    /// The queue does not exist on the backend.
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// The backend refused the subscription.
    #[error("failed to subscribe to {queue}: {reason}")]
    Subscription { queue: String, reason: String },

    /// A receive (poll) call failed.
    #[error("failed to receive from {queue}: {reason}")]
    Receive { queue: String, reason: String },

    /// A publish call failed.
    #[error("failed to publish to {destination}: {reason}")]
    Publish { destination: String, reason: String },

    /// Acknowledging, rejecting or deleting a message failed.
    #[error("failed to settle message: {0}")]
    Acknowledge(String),

    /// The broker or its connection has been closed.
    #[error("broker is closed")]
    Closed,

    /// A payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
