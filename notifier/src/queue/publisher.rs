//! Async RabbitMQ publisher for enqueueing messages.
//!
//! Every publish checks a channel out of the shared [`BrokerPools`], so the
//! publisher can be cloned freely across request handlers.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties,
};
use tracing::info;

use crate::pool::BrokerPools;

/// Durably enqueue a payload on a named queue.
#[async_trait]
pub trait Publish: Send + Sync {
    /// Returns once the broker has confirmed the message.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;
}

/// Channel-pooled RabbitMQ publisher.
#[derive(Clone)]
pub struct Publisher {
    pools: BrokerPools,
}

impl Publisher {
    pub fn new(pools: BrokerPools) -> Self {
        Self { pools }
    }

    pub fn pools(&self) -> &BrokerPools {
        &self.pools
    }

    /// Close the pooled connections.
    pub fn close(&self) {
        self.pools.close();
        info!("rabbitmq_publisher_closed");
    }
}

#[async_trait]
impl Publish for Publisher {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let channel = self
            .pools
            .channel()
            .await
            .context("Failed to acquire channel")?;

        // Idempotent, so declaring on every publish is safe.
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to declare queue {queue}"))?;

        let confirmation = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2) // Persistent
                    .with_content_type("application/json".into()),
            )
            .await
            .with_context(|| format!("Failed to publish to {queue}"))?
            .await
            .context("Failed to confirm publish")?;

        if confirmation.is_nack() {
            bail!("Broker rejected message for {queue}");
        }

        info!(
            queue = queue,
            body_length = payload.len(),
            "rabbitmq_message_published"
        );

        Ok(())
    }
}
