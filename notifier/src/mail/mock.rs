//! Mock mailer that captures sent emails.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{MailError, Mailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<SentEmail>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails, like a relay refusing our login.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// A mailer that takes `delay` before each send completes.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = &self.failure {
            return Err(MailError::Transport(failure.clone().into()));
        }

        self.sent.lock().await.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
