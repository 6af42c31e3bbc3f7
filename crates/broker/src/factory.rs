//! Broker construction from configuration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::{RABBITMQ, SQS};
use crate::{
    AmqpChannelClient, AwsQueueClient, BrokerConfig, BrokerError, InMemoryTransports,
    MessageBroker, RabbitMqBroker, Result, SqsBroker,
};

/// Builds and connects one backend from the full configuration.
pub type BrokerConstructor =
    Box<dyn Fn(BrokerConfig) -> BoxFuture<'static, Result<Arc<dyn MessageBroker>>> + Send + Sync>;

/// Registry of backend constructors keyed by lowercase type tag.
///
/// Adding a backend means registering one constructor; callers keep using
/// [`BrokerFactory::create`].
pub struct BrokerFactory {
    constructors: HashMap<String, BrokerConstructor>,
}

impl BrokerFactory {
    /// Registers the networked backends: `sqs` through the AWS SDK and
    /// `rabbitmq` over AMQP.
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register(SQS, connect_sqs);
        factory.register(RABBITMQ, connect_rabbitmq);
        factory
    }

    /// Creates a registry with no backends.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers both backends over in-memory transports. Every created
    /// broker gets its own connection to the shared queues.
    pub fn in_memory(transports: &InMemoryTransports) -> Self {
        let mut factory = Self::empty();

        let queues = transports.clone();
        factory.register(SQS, move |config: BrokerConfig| {
            let client = queues.queue_client();
            async move {
                let broker = SqsBroker::new(client, config.sqs)?;
                Ok::<_, BrokerError>(Arc::new(broker) as Arc<dyn MessageBroker>)
            }
        });

        let channels = transports.clone();
        factory.register(RABBITMQ, move |config: BrokerConfig| {
            let channel = channels.channel_client();
            async move {
                let broker = RabbitMqBroker::new(channel, config.rabbitmq)?;
                Ok::<_, BrokerError>(Arc::new(broker) as Arc<dyn MessageBroker>)
            }
        });

        factory
    }

    /// Registers a constructor, replacing any previous one for the tag.
    pub fn register<F, Fut>(&mut self, broker_type: &str, constructor: F) -> &mut Self
    where
        F: Fn(BrokerConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn MessageBroker>>> + Send + 'static,
    {
        self.constructors.insert(
            broker_type.trim().to_lowercase(),
            Box::new(move |config| constructor(config).boxed()),
        );
        self
    }

    /// Returns the registered tags, sorted.
    pub fn broker_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Creates the backend named by `config.broker_type`, matched
    /// case-insensitively.
    pub async fn create(&self, config: &BrokerConfig) -> Result<Arc<dyn MessageBroker>> {
        let requested = config.broker_type.trim();
        let constructor = self
            .constructors
            .get(&requested.to_lowercase())
            .ok_or_else(|| BrokerError::UnsupportedBrokerType(requested.to_string()))?;

        let broker = constructor(config.clone()).await?;
        tracing::info!(backend = broker.backend(), "broker created");
        Ok(broker)
    }
}

impl Default for BrokerFactory {
    fn default() -> Self {
        Self::new()
    }
}

async fn connect_sqs(config: BrokerConfig) -> Result<Arc<dyn MessageBroker>> {
    config.sqs.validate()?;
    let client = AwsQueueClient::connect(&config.sqs).await;
    let broker = SqsBroker::new(client, config.sqs)?;
    Ok(Arc::new(broker) as Arc<dyn MessageBroker>)
}

async fn connect_rabbitmq(config: BrokerConfig) -> Result<Arc<dyn MessageBroker>> {
    config.rabbitmq.validate()?;
    let channel = AmqpChannelClient::connect(&config.rabbitmq.url).await?;
    let broker = RabbitMqBroker::new(channel, config.rabbitmq)?;
    Ok(Arc::new(broker) as Arc<dyn MessageBroker>)
}

/// Creates a broker over in-memory transports.
pub async fn create_broker(
    config: &BrokerConfig,
    transports: &InMemoryTransports,
) -> Result<Arc<dyn MessageBroker>> {
    BrokerFactory::in_memory(transports).create(config).await
}
