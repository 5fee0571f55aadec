//! Welcome-email producer.
//!
//! Called from the registration path. The only wait is the broker's publish
//! confirm; SMTP delivery happens later in the worker.

use thiserror::Error;
use tracing::info;

use crate::queue::{InvalidRecipient, NotificationRequest, Publish, EMAIL_QUEUE};

/// Subject line of every welcome email.
pub const WELCOME_SUBJECT: &str = "Welcome!";

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error(transparent)]
    InvalidRecipient(#[from] InvalidRecipient),

    #[error("failed to enqueue notification: {0:#}")]
    Publish(anyhow::Error),
}

/// Build the welcome notification for a newly registered user.
pub fn welcome_request(email: &str, username: &str) -> Result<NotificationRequest, InvalidRecipient> {
    let body = format!(
        "Hello, {username}!\n\
         \n\
         Thank you for registering with our service.\n\
         \n\
         Best regards,\n\
         The project team\n"
    );

    NotificationRequest::new(email, WELCOME_SUBJECT, body)
}

/// Enqueue a welcome email on [`EMAIL_QUEUE`].
pub async fn send_welcome_email<P>(
    publisher: &P,
    email: &str,
    username: &str,
) -> Result<(), ProducerError>
where
    P: Publish + ?Sized,
{
    let request = welcome_request(email, username)?;

    publisher
        .publish(EMAIL_QUEUE, &request.encode())
        .await
        .map_err(ProducerError::Publish)?;

    info!(to = %request.to, queue = EMAIL_QUEUE, "welcome_email_enqueued");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::MemoryQueue;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct UnreachableBroker;

    #[async_trait]
    impl Publish for UnreachableBroker {
        async fn publish(&self, _: &str, _: &[u8]) -> anyhow::Result<()> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn test_welcome_request_template() {
        let request = welcome_request("newuser@example.com", "alice").unwrap();

        assert_eq!(request.to, "newuser@example.com");
        assert_eq!(request.subject, WELCOME_SUBJECT);
        assert!(request.body.starts_with("Hello, alice!"));
    }

    #[tokio::test]
    async fn test_send_welcome_email_enqueues_exactly_one() {
        let broker = MemoryQueue::new();

        send_welcome_email(&broker, "newuser@example.com", "alice")
            .await
            .unwrap();

        let messages = broker.peek(EMAIL_QUEUE);
        assert_eq!(messages.len(), 1);

        let request = NotificationRequest::decode(&messages[0]).unwrap();
        assert_eq!(request.to, "newuser@example.com");
        assert_eq!(request.subject, WELCOME_SUBJECT);
        assert!(request.body.contains("alice"));
    }

    #[tokio::test]
    async fn test_invalid_email_is_not_enqueued() {
        let broker = MemoryQueue::new();

        let err = send_welcome_email(&broker, "not-an-email", "bob")
            .await
            .unwrap_err();

        assert!(matches!(err, ProducerError::InvalidRecipient(_)));
        assert_eq!(broker.pending(EMAIL_QUEUE), 0);
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails_fast() {
        let err = send_welcome_email(&UnreachableBroker, "newuser@example.com", "alice")
            .await
            .unwrap_err();

        assert!(matches!(err, ProducerError::Publish(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
