//! Queue message types for the notification pipeline.
//!
//! Messages on `email_queue` are flat JSON objects with the keys `to`,
//! `subject` and `body`. There is no version field in the payload.

use lettre::address::AddressError;
use lettre::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue name for outbound email notifications.
pub const EMAIL_QUEUE: &str = "email_queue";

/// A single plain-text email waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Recipient email address
    pub to: String,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body: String,
}

/// The recipient address could not be parsed.
#[derive(Debug, Error)]
#[error("invalid recipient address {address:?}")]
pub struct InvalidRecipient {
    pub address: String,
    #[source]
    pub source: AddressError,
}

/// A queue payload that is not a valid notification.
#[derive(Debug, Error)]
#[error("malformed notification payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

impl NotificationRequest {
    /// Create a request, rejecting syntactically invalid recipients.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, InvalidRecipient> {
        let to = to.into();
        if let Err(source) = to.parse::<Address>() {
            return Err(InvalidRecipient { address: to, source });
        }

        Ok(Self {
            to,
            subject: subject.into(),
            body: body.into(),
        })
    }

    /// Serialize to the transit encoding.
    pub fn encode(&self) -> Vec<u8> {
        // Three string fields; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Parse a queue payload.
    ///
    /// The recipient is not re-validated here: a bad address surfaces as a
    /// delivery failure when the mail transport parses it.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_exact_fields() {
        let payload = br#"{"to":"a@b.com","subject":"S","body":"B"}"#;
        let request = NotificationRequest::decode(payload).unwrap();

        assert_eq!(request.to, "a@b.com");
        assert_eq!(request.subject, "S");
        assert_eq!(request.body, "B");
    }

    #[test]
    fn test_encode_uses_flat_keys() {
        let request = NotificationRequest::new("a@b.com", "S", "B").unwrap();
        let json = String::from_utf8(request.encode()).unwrap();

        assert_eq!(json, r#"{"to":"a@b.com","subject":"S","body":"B"}"#);
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let payload = br#"{"to":"a@b.com","subject":"S","body":"B","priority":"high"}"#;
        assert!(NotificationRequest::decode(payload).is_ok());
    }

    #[test]
    fn test_decode_missing_key() {
        let payload = br#"{"to":"a@b.com","subject":"S"}"#;
        let err = NotificationRequest::decode(payload).unwrap_err();
        assert!(err.to_string().contains("body"));
    }

    #[test]
    fn test_decode_not_json() {
        assert!(NotificationRequest::decode(b"not json at all").is_err());
        assert!(NotificationRequest::decode(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_new_rejects_invalid_recipient() {
        let err = NotificationRequest::new("not-an-email", "S", "B").unwrap_err();
        assert_eq!(err.address, "not-an-email");
    }
}
