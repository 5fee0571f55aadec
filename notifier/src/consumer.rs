//! RabbitMQ consumer for `email_queue`.
//!
//! The worker processes one message at a time (prefetch 1). Each message is
//! decoded and handed to the [`Mailer`]; whatever happens, the message is
//! acknowledged afterwards. A malformed payload or a failed delivery is logged
//! and dropped, never requeued.
//!
//! When the broker goes away the session ends, and [`run`] reconnects after
//! `reconnect_delay` until a shutdown signal arrives. Messages that were in
//! flight but not yet acknowledged are redelivered by the broker.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::FieldTable,
    Connection, ConnectionProperties,
};
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::mail::{MailError, Mailer, SmtpMailer};
use crate::queue::{DecodeError, NotificationRequest, EMAIL_QUEUE};
use crate::shutdown::shutdown_signal;

/// Why a message was dropped without a successful delivery.
#[derive(Debug)]
pub enum DropReason {
    Decode(DecodeError),
    Delivery(MailError),
    Timeout(Duration),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "{e}"),
            Self::Delivery(e) => write!(f, "{e}"),
            Self::Timeout(d) => write!(f, "delivery timed out after {}s", d.as_secs_f64()),
        }
    }
}

/// Result of processing one message.
#[derive(Debug)]
pub enum Outcome {
    Delivered,
    Dropped { reason: DropReason },
}

impl Outcome {
    /// Whether the message should be removed from the queue.
    ///
    /// Every outcome is acknowledged: a message gets exactly one processing
    /// attempt.
    pub fn should_ack(&self) -> bool {
        match self {
            Outcome::Delivered => true,
            Outcome::Dropped { .. } => true,
        }
    }
}

/// Counters for one consume session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub delivered: usize,
    pub dropped: usize,
}

/// A received message that can be acknowledged.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    fn payload(&self) -> &[u8];
    fn tag(&self) -> u64;
    async fn ack(&self) -> Result<()>;
}

#[async_trait]
impl Acknowledge for Delivery {
    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn tag(&self) -> u64 {
        self.delivery_tag
    }

    async fn ack(&self) -> Result<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .context("Failed to ack message")
    }
}

/// Decode one payload and attempt delivery.
///
/// Never fails: every error becomes [`Outcome::Dropped`].
pub async fn handle_message<M>(payload: &[u8], mailer: &M, deadline: Option<Duration>) -> Outcome
where
    M: Mailer + ?Sized,
{
    let request = match NotificationRequest::decode(payload) {
        Ok(request) => request,
        Err(e) => {
            error!(
                error = %e,
                body_preview = %String::from_utf8_lossy(&payload[..payload.len().min(200)]),
                "email_decode_failed"
            );
            return Outcome::Dropped {
                reason: DropReason::Decode(e),
            };
        }
    };

    let send = mailer.send_email(&request.to, &request.subject, &request.body);
    let result = match deadline {
        Some(limit) => match timeout(limit, send).await {
            Ok(result) => result,
            Err(_) => {
                error!(to = %request.to, timeout_secs = limit.as_secs_f64(), "email_send_timeout");
                return Outcome::Dropped {
                    reason: DropReason::Timeout(limit),
                };
            }
        },
        None => send.await,
    };

    match result {
        Ok(()) => Outcome::Delivered,
        Err(e) => {
            error!(to = %request.to, error = %e, "email_send_failed");
            Outcome::Dropped {
                reason: DropReason::Delivery(e),
            }
        }
    }
}

/// Process deliveries one by one until the stream ends or errors.
pub async fn drain<S, D, E, M>(deliveries: &mut S, mailer: &M, deadline: Option<Duration>) -> DrainStats
where
    S: Stream<Item = Result<D, E>> + Unpin,
    D: Acknowledge,
    E: fmt::Display,
    M: Mailer + ?Sized,
{
    let mut stats = DrainStats::default();

    while let Some(delivery) = deliveries.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!(error = %e, "rabbitmq_delivery_error");
                break;
            }
        };

        let delivery_tag = delivery.tag();
        info!(
            queue = EMAIL_QUEUE,
            delivery_tag = delivery_tag,
            body_length = delivery.payload().len(),
            "rabbitmq_message_received"
        );

        let outcome = handle_message(delivery.payload(), mailer, deadline).await;
        match &outcome {
            Outcome::Delivered => stats.delivered += 1,
            Outcome::Dropped { reason } => {
                stats.dropped += 1;
                warn!(delivery_tag = delivery_tag, reason = %reason, "email_dropped");
            }
        }

        if outcome.should_ack() {
            if let Err(e) = delivery.ack().await {
                error!(delivery_tag = delivery_tag, error = %e, "rabbitmq_ack_failed");
            }
        }
    }

    stats
}

/// Open a connection, subscribe to the queue and drain it.
async fn consume_session<M: Mailer + ?Sized>(config: &Config, mailer: &M) -> Result<DrainStats> {
    info!(url_length = config.rabbitmq_url.len(), "rabbitmq_connecting");

    let conn = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;

    info!("rabbitmq_connected");

    let channel = conn.create_channel().await.context("Failed to create channel")?;

    // One unacknowledged message at a time per worker.
    channel
        .basic_qos(1, BasicQosOptions::default())
        .await
        .context("Failed to set QoS")?;

    channel
        .queue_declare(
            EMAIL_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare queue")?;

    info!(queue = EMAIL_QUEUE, "rabbitmq_queue_declared");

    let mut consumer = channel
        .basic_consume(
            EMAIL_QUEUE,
            "notifier-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to start consumer")?;

    info!(queue = EMAIL_QUEUE, "rabbitmq_consumer_started");

    let stats = drain(&mut consumer, mailer, config.delivery_timeout).await;

    // Release any prefetched, unacked message before reconnecting.
    if let Err(e) = conn.close(200, "reconnecting").await {
        warn!(error = %e, "rabbitmq_connection_close_error");
    }

    Ok(stats)
}

/// Run the mail worker until SIGINT/SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let mailer = SmtpMailer::new(&config.smtp()).context("Failed to configure SMTP transport")?;

    info!(
        smtp_host = %config.smtp_host,
        smtp_port = config.smtp_port,
        delivery_timeout_secs = config.delivery_timeout.map(|d| d.as_secs()),
        "worker_ready"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            session = consume_session(&config, &mailer) => {
                match session {
                    Ok(stats) => warn!(
                        delivered = stats.delivered,
                        dropped = stats.dropped,
                        "rabbitmq_consumer_closed"
                    ),
                    Err(e) => error!(error = %format!("{e:#}"), "rabbitmq_session_failed"),
                }
            }
        }

        info!(delay_ms = config.reconnect_delay.as_millis() as u64, "rabbitmq_reconnect_scheduled");

        tokio::select! {
            _ = &mut shutdown => {
                info!("worker_stopping");
                break;
            }
            _ = sleep(config.reconnect_delay) => {}
        }
    }

    info!("worker_shutdown_complete");
    Ok(())
}
