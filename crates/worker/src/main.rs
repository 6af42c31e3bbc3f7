//! Worker entry point.

use broker::BrokerFactory;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use worker::config::{Config, LogFormat};
use worker::{Services, Worker};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    // 2. Install Prometheus exporter with its own scrape endpoint
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()
        .expect("failed to install Prometheus exporter");
    tracing::info!(port = config.metrics_port, "metrics endpoint listening");

    // 3. Create collaborators and start consumers
    let services = Services::create_default();
    let factory = BrokerFactory::new();
    let worker = Worker::start(&config, &factory, &services)
        .await
        .expect("failed to start consumers");
    tracing::info!(broker_type = %config.broker.broker_type, "order sync worker started");

    // 4. Run until a signal arrives or the consumers are cancelled
    let cancel = worker.cancel_token();
    tokio::select! {
        () = shutdown_signal() => {}
        () = cancel.cancelled() => {}
    }

    worker.shutdown().await.expect("failed to shut down cleanly");
    tracing::info!("worker shut down gracefully");
}
