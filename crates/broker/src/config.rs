//! Broker configuration.
//!
//! Holds parameters for every backend; each backend validates only its own
//! section, before any connection is attempted.

use std::time::Duration;

use crate::{BrokerError, Result};

/// Type tag of the long-poll backend.
pub const SQS: &str = "sqs";

/// Type tag of the push backend.
pub const RABBITMQ: &str = "rabbitmq";

/// Top-level broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Backend type tag, matched case-insensitively.
    pub broker_type: String,
    pub sqs: SqsSettings,
    pub rabbitmq: RabbitMqSettings,
}

impl BrokerConfig {
    pub fn new(broker_type: impl Into<String>) -> Self {
        Self {
            broker_type: broker_type.into(),
            sqs: SqsSettings::default(),
            rabbitmq: RabbitMqSettings::default(),
        }
    }

    pub fn with_sqs(mut self, sqs: SqsSettings) -> Self {
        self.sqs = sqs;
        self
    }

    pub fn with_rabbitmq(mut self, rabbitmq: RabbitMqSettings) -> Self {
        self.rabbitmq = rabbitmq;
        self
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(SQS)
    }
}

/// Parameters of the long-poll backend.
#[derive(Clone)]
pub struct SqsSettings {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub order_updates_queue_url: String,
    pub payment_confirmations_queue_url: String,
    pub order_error_queue_url: String,
    pub kitchen_queue_url: String,

    /// Messages per receive call, 1..=10.
    pub max_messages: u32,

    /// Long-poll wait per receive call.
    pub wait_time: Duration,

    /// Sleep after a failed receive call.
    pub error_backoff: Duration,
}

impl SqsSettings {
    pub const MAX_BATCH: u32 = 10;

    /// Checks required parameters.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(BrokerError::MissingParameter("region"));
        }
        for (name, url) in [
            ("order_updates_queue_url", &self.order_updates_queue_url),
            (
                "payment_confirmations_queue_url",
                &self.payment_confirmations_queue_url,
            ),
            ("order_error_queue_url", &self.order_error_queue_url),
            ("kitchen_queue_url", &self.kitchen_queue_url),
        ] {
            if url.trim().is_empty() {
                return Err(BrokerError::MissingParameter(name));
            }
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(BrokerError::InvalidParameter {
                name: "access_key_id",
                reason: "access key and secret must be set together".to_string(),
            });
        }
        if self.max_messages == 0 || self.max_messages > Self::MAX_BATCH {
            return Err(BrokerError::InvalidParameter {
                name: "max_messages",
                reason: format!("must be between 1 and {}", Self::MAX_BATCH),
            });
        }
        Ok(())
    }
}

impl Default for SqsSettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            order_updates_queue_url: String::new(),
            payment_confirmations_queue_url: String::new(),
            order_error_queue_url: String::new(),
            kitchen_queue_url: String::new(),
            max_messages: Self::MAX_BATCH,
            wait_time: Duration::from_secs(20),
            error_backoff: Duration::from_secs(5),
        }
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for SqsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsSettings")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "***"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("endpoint_url", &self.endpoint_url)
            .field("order_updates_queue_url", &self.order_updates_queue_url)
            .field(
                "payment_confirmations_queue_url",
                &self.payment_confirmations_queue_url,
            )
            .field("order_error_queue_url", &self.order_error_queue_url)
            .field("kitchen_queue_url", &self.kitchen_queue_url)
            .field("max_messages", &self.max_messages)
            .field("wait_time", &self.wait_time)
            .field("error_backoff", &self.error_backoff)
            .finish()
    }
}

/// Parameters of the push backend.
#[derive(Debug, Clone)]
pub struct RabbitMqSettings {
    pub url: String,
    pub order_updates_queue: String,
    pub payment_confirmations_queue: String,
    pub order_error_queue: String,
    pub kitchen_queue: String,

    /// Unacknowledged deliveries allowed per subscription.
    pub prefetch_count: u16,
}

impl RabbitMqSettings {
    /// Checks required parameters.
    pub fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(BrokerError::MissingParameter("url"));
        }
        if !(url.starts_with("amqp://") || url.starts_with("amqps://")) {
            return Err(BrokerError::InvalidParameter {
                name: "url",
                reason: format!("expected an amqp:// or amqps:// URL, got '{url}'"),
            });
        }
        for (name, queue) in [
            ("order_updates_queue", &self.order_updates_queue),
            ("payment_confirmations_queue", &self.payment_confirmations_queue),
            ("order_error_queue", &self.order_error_queue),
            ("kitchen_queue", &self.kitchen_queue),
        ] {
            if queue.trim().is_empty() {
                return Err(BrokerError::MissingParameter(name));
            }
        }
        if self.prefetch_count == 0 {
            return Err(BrokerError::InvalidParameter {
                name: "prefetch_count",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RabbitMqSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            order_updates_queue: "order-updates".to_string(),
            payment_confirmations_queue: "payment-confirmations".to_string(),
            order_error_queue: "order-errors".to_string(),
            kitchen_queue: "kitchen-orders".to_string(),
            prefetch_count: 10,
        }
    }
}
