//! SMTP delivery using lettre.

use std::error::Error as StdError;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use super::{MailError, Mailer};

/// SMTP relay settings.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

/// Delivers mail through a STARTTLS relay with login credentials.
///
/// The transport is built without connection pooling, so every send opens
/// its own SMTP session and closes it before returning, on success or error.
/// Any other lettre transport can be plugged in with [`SmtpMailer::with_transport`].
pub struct SmtpMailer<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| MailError::Transport(Box::new(e)))?
            .port(settings.port)
            .credentials(creds)
            .build();

        Self::with_transport(transport, &settings.from)
    }
}

impl<T> SmtpMailer<T> {
    pub fn with_transport(transport: T, from: &str) -> Result<Self, MailError> {
        Ok(Self {
            transport,
            from: parse_mailbox(from)?,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message, MailError> {
        let to = parse_mailbox(to)?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        Ok(message)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|source| MailError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

#[async_trait]
impl<T> Mailer for SmtpMailer<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: StdError + Send + Sync + 'static,
{
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = self.build_message(to, subject, body)?;

        // Negative SMTP replies already come back as errors.
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(Box::new(e)))?;

        info!(to = %to, "email_sent");
        Ok(())
    }
}
