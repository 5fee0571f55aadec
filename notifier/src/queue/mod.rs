//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The notification message type and its transit encoding
//! - A channel-pooled publisher behind the [`Publish`] trait
//!
//! ## Architecture
//!
//! ```text
//! Registration → Producer → Publisher → email_queue → Consumer → SMTP relay
//! ```

#[cfg(test)]
pub(crate) mod memory;
pub mod publisher;
pub mod types;

pub use publisher::{Publish, Publisher};
pub use types::{DecodeError, InvalidRecipient, NotificationRequest, EMAIL_QUEUE};
