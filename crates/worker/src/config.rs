//! Worker configuration loaded from environment variables.

use std::time::Duration;

use broker::{BrokerConfig, RabbitMqSettings, SqsSettings};
use order_sync::StatusFallback;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Worker configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BROKER_TYPE` — backend tag, `sqs` or `rabbitmq` (default: `"sqs"`)
/// - `AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_ENDPOINT_URL`
/// - `SQS_ORDER_UPDATES_QUEUE_URL`, `SQS_PAYMENT_CONFIRMATIONS_QUEUE_URL`,
///   `SQS_ORDER_ERROR_QUEUE_URL`, `SQS_KITCHEN_QUEUE_URL`
/// - `SQS_MAX_MESSAGES` (default: `10`), `SQS_WAIT_TIME_SECONDS` (default: `20`),
///   `SQS_ERROR_BACKOFF_SECONDS` (default: `5`)
/// - `RABBITMQ_URL`, `RABBITMQ_ORDER_UPDATES_QUEUE`, `RABBITMQ_PAYMENT_CONFIRMATIONS_QUEUE`,
///   `RABBITMQ_ORDER_ERROR_QUEUE`, `RABBITMQ_KITCHEN_QUEUE`, `RABBITMQ_PREFETCH_COUNT`
/// - `METRICS_PORT` — Prometheus listener port (default: `9090`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `"text"`)
/// - `STATUS_FALLBACK` — `transient` or `reject` (default: `"transient"`)
///
/// Unparseable values fall back to their defaults. Backend parameters are
/// validated when the broker is created.
#[derive(Debug, Clone)]
pub struct Config {
    pub broker: BrokerConfig,
    pub metrics_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub status_fallback: StatusFallback,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let sqs_defaults = SqsSettings::default();
        let rabbit_defaults = RabbitMqSettings::default();

        let text = |name: &str, default: String| lookup(name).unwrap_or(default);
        let seconds = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let sqs = SqsSettings {
            region: text("AWS_REGION", sqs_defaults.region.clone()),
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            endpoint_url: lookup("AWS_ENDPOINT_URL"),
            order_updates_queue_url: text("SQS_ORDER_UPDATES_QUEUE_URL", String::new()),
            payment_confirmations_queue_url: text(
                "SQS_PAYMENT_CONFIRMATIONS_QUEUE_URL",
                String::new(),
            ),
            order_error_queue_url: text("SQS_ORDER_ERROR_QUEUE_URL", String::new()),
            kitchen_queue_url: text("SQS_KITCHEN_QUEUE_URL", String::new()),
            max_messages: lookup("SQS_MAX_MESSAGES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(sqs_defaults.max_messages),
            wait_time: seconds("SQS_WAIT_TIME_SECONDS", sqs_defaults.wait_time),
            error_backoff: seconds("SQS_ERROR_BACKOFF_SECONDS", sqs_defaults.error_backoff),
        };

        let rabbitmq = RabbitMqSettings {
            url: text("RABBITMQ_URL", rabbit_defaults.url),
            order_updates_queue: text(
                "RABBITMQ_ORDER_UPDATES_QUEUE",
                rabbit_defaults.order_updates_queue,
            ),
            payment_confirmations_queue: text(
                "RABBITMQ_PAYMENT_CONFIRMATIONS_QUEUE",
                rabbit_defaults.payment_confirmations_queue,
            ),
            order_error_queue: text("RABBITMQ_ORDER_ERROR_QUEUE", rabbit_defaults.order_error_queue),
            kitchen_queue: text("RABBITMQ_KITCHEN_QUEUE", rabbit_defaults.kitchen_queue),
            prefetch_count: lookup("RABBITMQ_PREFETCH_COUNT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(rabbit_defaults.prefetch_count),
        };

        let broker_type = text("BROKER_TYPE", defaults.broker.broker_type.clone());

        Self {
            broker: BrokerConfig::new(broker_type)
                .with_sqs(sqs)
                .with_rabbitmq(rabbitmq),
            metrics_port: lookup("METRICS_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.metrics_port),
            log_level: text("RUST_LOG", defaults.log_level),
            log_format: match lookup("LOG_FORMAT") {
                Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            status_fallback: lookup("STATUS_FALLBACK")
                .and_then(|v| StatusFallback::parse(&v))
                .unwrap_or_default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            metrics_port: 9090,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            status_fallback: StatusFallback::Transient,
        }
    }
}
