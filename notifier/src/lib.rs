//! Notifier - asynchronous welcome-email pipeline over RabbitMQ.
//!
//! This library provides shared modules for the two binaries:
//! - `notifier-web`: registration-facing service that enqueues welcome emails
//! - `notifier-worker`: consumer that delivers queued emails over SMTP
//!
//! ## Architecture
//!
//! ```text
//! Registration → Producer → Publisher (pooled channels) → email_queue → Worker → SMTP
//! ```

pub mod config;
pub mod consumer;
pub mod mail;
pub mod pool;
pub mod producer;
pub mod queue;
pub mod shutdown;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use consumer::{handle_message, DropReason, Outcome};
pub use mail::{MailError, Mailer, SmtpMailer};
pub use pool::{BrokerPools, PoolSettings};
pub use producer::{send_welcome_email, ProducerError};
pub use queue::{NotificationRequest, Publish, Publisher, EMAIL_QUEUE};
pub use web::AppState;
