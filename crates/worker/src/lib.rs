//! Order synchronization worker.
//!
//! Wires the three consumers to brokers built from configuration, and owns
//! the cancellation token that stops them.

pub mod config;

use std::sync::Arc;

use broker::{BrokerFactory, CancellationToken, MessageBroker};
use gateway::{InMemoryOrderGateway, InMemoryOrderStatusGateway};
use order_sync::{OrderErrorConsumer, OrderUpdatesConsumer, PaymentConsumer};

use config::Config;

/// Collaborators the consumers run against.
#[derive(Clone, Default)]
pub struct Services {
    pub orders: InMemoryOrderGateway,
    pub statuses: InMemoryOrderStatusGateway,
}

impl Services {
    /// Creates services with the well-known statuses seeded.
    pub fn create_default() -> Self {
        Self {
            orders: InMemoryOrderGateway::new(),
            statuses: InMemoryOrderStatusGateway::with_defaults(),
        }
    }
}

/// Running consumers and the brokers they use.
pub struct Worker {
    broker: Arc<dyn MessageBroker>,
    kitchen: Arc<dyn MessageBroker>,
    cancel: CancellationToken,
}

impl Worker {
    /// Creates the brokers and starts all three consumers.
    ///
    /// The kitchen publisher gets its own broker so closing the consuming
    /// side never races an outgoing notification.
    pub async fn start(
        config: &Config,
        factory: &BrokerFactory,
        services: &Services,
    ) -> broker::Result<Self> {
        let broker = factory.create(&config.broker).await?;
        let kitchen = match factory.create(&config.broker).await {
            Ok(kitchen) => kitchen,
            Err(e) => {
                if let Err(close_error) = broker.close().await {
                    tracing::warn!(error = %close_error, "failed to close broker after start failure");
                }
                return Err(e);
            }
        };
        let cancel = CancellationToken::new();

        let updates = OrderUpdatesConsumer::new(
            Arc::clone(&broker),
            services.orders.clone(),
            services.statuses.clone(),
        );
        let payments = PaymentConsumer::new(
            Arc::clone(&broker),
            Arc::clone(&kitchen),
            services.orders.clone(),
            services.statuses.clone(),
        )
        .with_status_fallback(config.status_fallback);
        let errors = OrderErrorConsumer::new(Arc::clone(&broker), services.orders.clone());

        let started = async {
            Arc::new(updates).start(cancel.clone()).await?;
            Arc::new(payments).start(cancel.clone()).await?;
            Arc::new(errors).start(cancel.clone()).await
        }
        .await;

        let worker = Self {
            broker,
            kitchen,
            cancel,
        };
        if let Err(e) = started {
            // Stop whatever did start before reporting the original error.
            if let Err(shutdown_error) = worker.shutdown().await {
                tracing::warn!(error = %shutdown_error, "failed to shut down after start failure");
            }
            return Err(e);
        }

        tracing::info!(backend = worker.broker.backend(), "consumers started");
        Ok(worker)
    }

    /// Token observed by every consumer.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the consumers, waits for in-flight messages to finish and
    /// releases both brokers.
    pub async fn shutdown(self) -> broker::Result<()> {
        self.cancel.cancel();
        self.broker.shutdown().await;
        self.broker.close().await?;
        self.kitchen.close().await?;
        tracing::info!("consumers stopped");
        Ok(())
    }
}
