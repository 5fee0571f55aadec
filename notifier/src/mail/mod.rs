//! Outbound mail delivery.
//!
//! [`Mailer`] is the seam between the queue consumer and the SMTP relay.
//! Errors are returned to the consumer, which logs them and drops the message.

#[cfg(test)]
pub(crate) mod mock;
pub mod smtp;

use async_trait::async_trait;
use lettre::address::AddressError;
use thiserror::Error;

pub use smtp::{SmtpMailer, SmtpSettings};

/// Errors from rendering or sending a single email.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("mail transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Sends one plain-text email to one recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}
