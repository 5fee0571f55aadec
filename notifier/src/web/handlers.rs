//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::producer::{send_welcome_email, ProducerError};
use crate::queue::Publish;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn Publish>,
}

impl AppState {
    pub fn new(publisher: impl Publish + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Welcome Email
// =============================================================================

/// Sent by the registration flow once a user account exists.
#[derive(Debug, Deserialize)]
pub struct WelcomeEmailRequest {
    pub email: String,
    pub username: String,
}

#[derive(Serialize)]
pub struct WelcomeEmailResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Welcome email endpoint.
///
/// Returns 202 once the message is durably queued, 422 for an invalid
/// address and 503 when the broker cannot be reached.
pub async fn welcome_email(
    State(state): State<AppState>,
    Json(request): Json<WelcomeEmailRequest>,
) -> impl IntoResponse {
    info!(username = %request.username, "welcome_email_requested");

    match send_welcome_email(state.publisher.as_ref(), &request.email, &request.username).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(WelcomeEmailResponse {
                status: "queued",
                error: None,
            }),
        ),
        Err(ProducerError::InvalidRecipient(e)) => {
            warn!(error = %e, "welcome_email_invalid_recipient");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(WelcomeEmailResponse {
                    status: "rejected",
                    error: Some(e.to_string()),
                }),
            )
        }
        Err(e @ ProducerError::Publish(_)) => {
            error!(error = %e, "welcome_email_enqueue_failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(WelcomeEmailResponse {
                    status: "unavailable",
                    error: Some("notification queue unavailable".to_string()),
                }),
            )
        }
    }
}
