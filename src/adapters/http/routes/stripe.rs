//! Stripe-facing endpoints: the webhook receiver and the hosted checkout
//! flows the web app drives.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, extractors::AuthUser},
    app_error::{AppError, AppResult},
    application::{jwt, use_cases::webhook::is_retryable_error},
    infra::stripe_client::{StripeClient, StripeWebhookEvent},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/create-registration", post(create_registration))
        .route("/complete-registration", post(complete_registration))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/create-portal-session", post(create_portal_session))
}

// ============================================================================
// Webhook
// ============================================================================

fn acknowledged() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "received": true }))).into_response()
}

/// Returns 500 Internal Server Error for Stripe to retry the webhook.
fn webhook_retryable_error(
    error: &AppError,
    event_type: &str,
    event_id: &str,
    context: &str,
) -> Response {
    error!(
        error = %error,
        event_type,
        event_id,
        context,
        retryable = true,
        "Webhook processing failed, returning 500 for Stripe retry"
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "received": false })),
    )
        .into_response()
}

/// POST /api/stripe/webhook
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Response> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("Missing stripe-signature header".into()))?;

    StripeClient::verify_webhook_signature(
        &body,
        signature,
        app_state.config.stripe_webhook_secret.expose_secret(),
        Utc::now(),
    )?;

    // A signed but undecodable payload will not decode on redelivery either.
    let event = match StripeWebhookEvent::parse(&body).and_then(|e| e.into_webhook_event()) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, retryable = false, "Malformed webhook payload acknowledged");
            return Ok(acknowledged());
        }
    };

    let event_type = event.event.event_type().to_string();

    match app_state.webhook_use_cases.handle(&event).await {
        Ok(outcome) => {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event_type,
                outcome = outcome.as_str(),
                "Webhook handled"
            );
            Ok(acknowledged())
        }
        Err(e) if is_retryable_error(&e) => Ok(webhook_retryable_error(
            &e,
            &event_type,
            &event.id,
            "handle_event",
        )),
        Err(e) => {
            warn!(
                error = %e,
                event_id = %event.id,
                event_type = %event_type,
                retryable = false,
                "Webhook event not applied, acknowledging"
            );
            Ok(acknowledged())
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRegistrationRequest {
    email: String,
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRegistrationResponse {
    session_id: String,
    url: String,
    user_id: Uuid,
}

/// POST /api/stripe/create-registration
async fn create_registration(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateRegistrationRequest>,
) -> AppResult<impl IntoResponse> {
    let started = app_state
        .registration_use_cases
        .create_registration(&payload.email, payload.display_name.as_deref())
        .await?;

    Ok(Json(CreateRegistrationResponse {
        session_id: started.session_id,
        url: started.url,
        user_id: started.user_id,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRegistrationRequest {
    session_id: String,
    setup_intent_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRegistrationResponse {
    custom_token: String,
}

/// POST /api/stripe/complete-registration
async fn complete_registration(
    State(app_state): State<AppState>,
    Json(payload): Json<CompleteRegistrationRequest>,
) -> AppResult<impl IntoResponse> {
    if payload.session_id.trim().is_empty() || payload.setup_intent_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "sessionId and setupIntentId are required".into(),
        ));
    }

    let record = app_state
        .registration_use_cases
        .complete_registration(&payload.session_id, &payload.setup_intent_id)
        .await?;

    let custom_token = jwt::issue(
        record.user_id,
        record.tier,
        &app_state.config.jwt_secret,
        app_state.config.session_token_ttl,
    )?;

    Ok(Json(CompleteRegistrationResponse { custom_token }))
}

// ============================================================================
// Checkout & Portal
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionResponse {
    session_id: String,
    url: String,
}

/// POST /api/stripe/create-checkout-session
async fn create_checkout_session(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let started = app_state
        .registration_use_cases
        .create_upgrade_checkout(user.user_id)
        .await?;

    Ok(Json(CheckoutSessionResponse {
        session_id: started.session_id,
        url: started.url,
    }))
}

#[derive(Serialize)]
struct PortalSessionResponse {
    url: String,
}

/// POST /api/stripe/create-portal-session
async fn create_portal_session(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let url = app_state
        .registration_use_cases
        .create_portal_session(user.user_id)
        .await?;

    Ok(Json(PortalSessionResponse { url }))
}
