//! In-memory transports for both backends.
//!
//! Used by tests and by local runs of the worker. Queues live in a shared
//! hub; every client handed out is a separate connection with its own close
//! state, so closing one broker leaves other brokers on the same hub usable.

mod channel;
mod queue;

use std::sync::Arc;

pub use channel::InMemoryChannelClient;
pub use queue::InMemoryQueueClient;

use crate::BrokerConfig;

/// Shared queue storage for in-memory clients.
#[derive(Clone, Default)]
pub struct InMemoryTransports {
    queues: Arc<queue::QueueHub>,
    channels: Arc<channel::ChannelHub>,
}

impl InMemoryTransports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new long-poll connection.
    pub fn queue_client(&self) -> InMemoryQueueClient {
        InMemoryQueueClient::new(Arc::clone(&self.queues))
    }

    /// Opens a new push channel.
    pub fn channel_client(&self) -> InMemoryChannelClient {
        InMemoryChannelClient::new(Arc::clone(&self.channels))
    }

    /// Creates a long-poll queue. Existing queues are kept.
    pub async fn create_queue(&self, queue_url: &str) {
        self.queues.create(queue_url).await;
    }

    /// Declares a push queue. Existing queues are kept.
    pub async fn declare_queue(&self, name: &str) {
        self.channels.declare(name).await;
    }

    /// Creates every queue named in the configuration, for both backends.
    pub async fn declare_all(&self, config: &BrokerConfig) {
        for url in [
            &config.sqs.order_updates_queue_url,
            &config.sqs.payment_confirmations_queue_url,
            &config.sqs.order_error_queue_url,
            &config.sqs.kitchen_queue_url,
        ] {
            if !url.is_empty() {
                self.create_queue(url).await;
            }
        }
        for name in [
            &config.rabbitmq.order_updates_queue,
            &config.rabbitmq.payment_confirmations_queue,
            &config.rabbitmq.order_error_queue,
            &config.rabbitmq.kitchen_queue,
        ] {
            if !name.is_empty() {
                self.declare_queue(name).await;
            }
        }
    }
}
