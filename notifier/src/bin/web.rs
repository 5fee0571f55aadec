//! Notifier Web Server - registration-facing notification API.
//!
//! This binary provides a thin web server that:
//! - Accepts welcome-email requests from the registration flow
//! - Validates the recipient address
//! - Enqueues the notification to RabbitMQ through pooled channels
//! - Returns 202 Accepted without waiting for SMTP delivery

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notifier::shutdown::shutdown_signal;
use notifier::web::{health, welcome_email, AppState};
use notifier::{BrokerPools, Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        pool_max_connections = config.pool_max_connections,
        pool_max_channels = config.pool_max_channels,
        "config_loaded"
    );

    // Pools live for the whole process and are shared by every request
    let pools = BrokerPools::new(config.rabbitmq_url.clone(), &config.pool())
        .context("Failed to create RabbitMQ pools")?;
    let publisher = Publisher::new(pools);
    info!("rabbitmq_publisher_created");

    let state = AppState::new(publisher.clone());

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/users/welcome", post(welcome_email))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("web_server_shutting_down");
        })
        .await
        .context("Server error")?;

    publisher.close();

    info!("web_server_shutdown_complete");

    Ok(())
}
