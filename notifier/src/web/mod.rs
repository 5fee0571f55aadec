//! Web server module for the registration-facing API.
//!
//! The service only validates input and enqueues the notification; it never
//! waits for SMTP delivery.

pub mod handlers;

pub use handlers::{
    health, welcome_email, AppState, HealthResponse, WelcomeEmailRequest, WelcomeEmailResponse,
};
