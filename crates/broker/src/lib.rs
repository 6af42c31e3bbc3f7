//! Message broker abstraction for the order synchronization subsystem.
//!
//! Consumers talk to a [`MessageBroker`] and never to a queue technology
//! directly. Two backends implement it:
//! - [`SqsBroker`]: long-polls a queue in batches and deletes handled messages
//! - [`RabbitMqBroker`]: drains a pushed delivery stream and acks each delivery
//!
//! Both are generic over a transport client ([`QueueClient`] /
//! [`ChannelClient`]). [`AwsQueueClient`] and [`AmqpChannelClient`] talk to
//! real services; the [`memory`] transports run everything in process.
//! [`BrokerFactory`] picks a backend from configuration.

pub mod broker;
pub mod config;
mod dispatch;
pub mod error;
pub mod factory;
pub mod handler;
pub mod memory;
pub mod message;
pub mod rabbitmq;
pub mod sqs;

pub use broker::MessageBroker;
pub use config::{BrokerConfig, RabbitMqSettings, SqsSettings};
pub use error::{BrokerError, Result};
pub use factory::{BrokerFactory, create_broker};
pub use handler::{
    Disposition, ErrorKind, HandlerError, MessageHandler, classify, should_discard_message,
};
pub use memory::{InMemoryChannelClient, InMemoryQueueClient, InMemoryTransports};
pub use message::{
    KitchenItem, KitchenNotification, OrderErrorMessage, OrderUpdateMessage,
    PaymentConfirmationMessage,
};
pub use rabbitmq::{
    Acknowledger, AmqpChannelClient, ChannelClient, Delivery, DeliveryStream, RabbitMqBroker,
};
pub use sqs::{AwsQueueClient, QueueClient, ReceivedMessage, SqsBroker};

// Re-exported so callers do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
