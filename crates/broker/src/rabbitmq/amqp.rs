//! AMQP 0-9-1 transport.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;

use crate::config::RABBITMQ;
use crate::rabbitmq::{Acknowledger, ChannelClient, Delivery, DeliveryStream};
use crate::{BrokerError, Result};

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// Persistent delivery mode.
const PERSISTENT: u8 = 2;

/// [`ChannelClient`] over one AMQP connection.
///
/// Publishing shares a single channel. Every subscription gets a channel of
/// its own so the prefetch limit applies per consumer.
pub struct AmqpChannelClient {
    connection: Connection,
    publisher: Channel,

    /// Subscription channels, held open until the connection closes.
    consumers: Mutex<Vec<Channel>>,
    closed: AtomicBool,
}

impl AmqpChannelClient {
    /// Opens the connection and the publishing channel.
    pub async fn connect(url: &str) -> Result<Self> {
        let connection_error = |e: lapin::Error| BrokerError::Connection {
            backend: RABBITMQ,
            reason: e.to_string(),
        };

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(connection_error)?;
        let publisher = connection
            .create_channel()
            .await
            .map_err(connection_error)?;

        tracing::info!("amqp connection established");
        Ok(Self {
            connection,
            publisher,
            consumers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl Acknowledger for AmqpAcker {
    async fn ack(&self) -> Result<()> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
            .map_err(|e| BrokerError::Acknowledge(e.to_string()))
    }

    async fn nack(&self, requeue: bool) -> Result<()> {
        let options = BasicNackOptions {
            requeue,
            ..Default::default()
        };
        self.0
            .nack(options)
            .await
            .map(|_| ())
            .map_err(|e| BrokerError::Acknowledge(e.to_string()))
    }
}

#[async_trait]
impl ChannelClient for AmqpChannelClient {
    async fn subscribe(&self, queue: &str, prefetch_count: u16) -> Result<DeliveryStream> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        let subscription_error = |e: lapin::Error| BrokerError::Subscription {
            queue: queue.to_string(),
            reason: e.to_string(),
        };

        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(subscription_error)?;
        channel
            .basic_qos(prefetch_count, BasicQosOptions::default())
            .await
            .map_err(subscription_error)?;
        // Consuming an undeclared queue closes the channel with 404, which
        // surfaces here.
        let consumer = channel
            .basic_consume(
                queue,
                "",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(subscription_error)?;
        self.consumers.lock().await.push(channel);
        tracing::debug!(queue, prefetch_count, "subscribed");

        let queue_name = queue.to_string();
        let deliveries = consumer.filter_map(move |delivery| {
            let delivery = match delivery {
                Ok(delivery) => Some(Delivery::new(
                    delivery.delivery_tag,
                    delivery.data,
                    delivery.redelivered,
                    AmqpAcker(delivery.acker),
                )),
                Err(e) => {
                    tracing::warn!(queue = %queue_name, error = %e, "consumer error");
                    None
                }
            };
            futures_util::future::ready(delivery)
        });

        Ok(Box::pin(deliveries))
    }

    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<()> {
        let publish_error = |e: lapin::Error| BrokerError::Publish {
            destination: routing_key.to_string(),
            reason: e.to_string(),
        };
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT);

        self.publisher
            .basic_publish(
                "",
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(publish_error)?
            .await
            .map_err(publish_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Closing the connection closes every channel; unacked deliveries
        // are requeued by the broker.
        self.connection
            .close(REPLY_SUCCESS, "closing")
            .await
            .map_err(|e| BrokerError::Connection {
                backend: RABBITMQ,
                reason: e.to_string(),
            })?;
        tracing::info!("amqp connection closed");
        Ok(())
    }
}
