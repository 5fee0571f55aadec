//! Notifier Worker - RabbitMQ consumer that delivers queued emails over SMTP.
//!
//! Drains the email_queue one message at a time. Failed deliveries are logged
//! and acknowledged; run more worker processes to scale out.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notifier::{consumer, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("worker_starting");

    // Load configuration from environment
    let config = Config::from_env();
    config.validate()?;
    tracing::info!(
        rabbitmq_url_set = !config.rabbitmq_url.is_empty(),
        smtp_host = %config.smtp_host,
        smtp_port = config.smtp_port,
        reconnect_delay_ms = config.reconnect_delay.as_millis() as u64,
        "config_loaded"
    );

    consumer::run(config).await?;

    Ok(())
}
