use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        billing_event::{
            BillingEvent, CHECKOUT_SESSION_COMPLETED, CheckoutCompletion,
            INVOICE_PAYMENT_FAILED, INVOICE_PAYMENT_SUCCEEDED, InvoiceSummary,
            SUBSCRIPTION_DELETED, SUBSCRIPTION_UPDATED, SubscriptionSnapshot, WebhookEvent,
        },
        subscription_status::SubscriptionStatus,
    },
    infra::http_client::build_client,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a signed webhook timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: build_client(),
            secret_key,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:", self.secret_key));
        format!("Basic {}", encoded)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", STRIPE_API_BASE, path)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        self.send_form(path, params, None).await
    }

    /// POST with an `Idempotency-Key`; Stripe replays the first result for
    /// repeated keys instead of creating another object.
    async fn post_form_idempotent<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
        idempotency_key: &str,
    ) -> AppResult<T> {
        self.send_form(path, params, Some(idempotency_key)).await
    }

    async fn send_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> AppResult<T> {
        let mut request = self
            .client
            .post(self.url(path))
            .header("Authorization", self.auth_header())
            .form(params);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    /// GET that maps a Stripe 404 to `None`.
    async fn get_optional<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Option<T>> {
        let response = self
            .client
            .get(self.url(path))
            .header("Authorization", self.auth_header())
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Stripe request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn create_customer(&self, email: &str, user_id: &str) -> AppResult<StripeCustomer> {
        let params = vec![
            ("email".to_string(), email.to_string()),
            ("metadata[user_id]".to_string(), user_id.to_string()),
        ];
        self.post_form("customers", &params).await
    }

    pub async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> AppResult<StripeCustomer> {
        let params = vec![(
            "invoice_settings[default_payment_method]".to_string(),
            payment_method_id.to_string(),
        )];
        self.post_form(&format!("customers/{}", customer_id), &params)
            .await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    /// Setup-mode session: collects a payment method without charging.
    pub async fn create_setup_checkout_session(
        &self,
        customer_id: &str,
        client_reference_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> AppResult<StripeCheckoutSession> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("mode".to_string(), "setup".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("client_reference_id".to_string(), client_reference_id.to_string()),
            ("metadata[user_id]".to_string(), client_reference_id.to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];
        self.post_form("checkout/sessions", &params).await
    }

    pub async fn create_subscription_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        client_reference_id: &str,
        success_url: &str,
        cancel_url: &str,
        trial_days: u32,
    ) -> AppResult<StripeCheckoutSession> {
        let mut params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("client_reference_id".to_string(), client_reference_id.to_string()),
            ("metadata[user_id]".to_string(), client_reference_id.to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        if trial_days > 0 {
            params.push((
                "subscription_data[trial_period_days]".to_string(),
                trial_days.to_string(),
            ));
        }

        self.post_form("checkout/sessions", &params).await
    }

    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<StripeCheckoutSession>> {
        self.get_optional(&format!("checkout/sessions/{}", session_id), &[])
            .await
    }

    // ========================================================================
    // Setup Intents
    // ========================================================================

    pub async fn get_setup_intent(&self, setup_intent_id: &str) -> AppResult<Option<StripeSetupIntent>> {
        self.get_optional(&format!("setup_intents/{}", setup_intent_id), &[])
            .await
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        payment_method_id: &str,
        trial_days: u32,
        idempotency_key: &str,
    ) -> AppResult<StripeSubscription> {
        let mut params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("items[0][price]".to_string(), price_id.to_string()),
            (
                "default_payment_method".to_string(),
                payment_method_id.to_string(),
            ),
            (
                "trial_settings[end_behavior][missing_payment_method]".to_string(),
                "cancel".to_string(),
            ),
        ];

        if trial_days > 0 {
            params.push(("trial_period_days".to_string(), trial_days.to_string()));
        }

        self.post_form_idempotent("subscriptions", &params, idempotency_key)
            .await
    }

    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<StripeSubscription>> {
        self.get_optional(&format!("subscriptions/{}", subscription_id), &[])
            .await
    }

    // ========================================================================
    // Customer Portal
    // ========================================================================

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<StripePortalSession> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        self.post_form("billing_portal/sessions", &params).await
    }

    // ========================================================================
    // Webhook Signature Verification
    // ========================================================================

    /// Checks a `stripe-signature` header (`t=<ts>,v1=<hex>,...`) against an
    /// HMAC-SHA256 of `"{t}.{payload}"` keyed by the endpoint secret.
    pub fn verify_webhook_signature(
        payload: &str,
        signature_header: &str,
        webhook_secret: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = Some(value),
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::InvalidSignature("Missing timestamp in signature".into()))?;

        if signatures.is_empty() {
            return Err(AppError::InvalidSignature("Missing v1 signature".into()));
        }

        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("HMAC error".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        if !signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected))
        {
            return Err(AppError::InvalidSignature("Signature mismatch".into()));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::InvalidSignature("Invalid timestamp".into()))?;
        if (now.timestamp() - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(AppError::InvalidSignature(
                "Timestamp outside tolerance".into(),
            ));
        }

        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if status.is_client_error()
                && status != StatusCode::TOO_MANY_REQUESTS
                && let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body)
            {
                return Err(AppError::InvalidInput(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Provider(format!("Stripe API error: {}", status)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Signature header for `payload`, in the format Stripe sends.
#[cfg(test)]
pub fn sign_webhook_payload(payload: &str, webhook_secret: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes()) else {
        return String::new();
    };
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

pub(crate) fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

// ============================================================================
// Stripe Types
// ============================================================================

/// Expandable reference: either an ID string or the expanded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StripeRef {
    Id(String),
    Object { id: String },
}

impl StripeRef {
    pub fn id(&self) -> &str {
        match self {
            StripeRef::Id(id) => id,
            StripeRef::Object { id } => id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeMetadata {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub mode: Option<String>,
    pub customer: Option<StripeRef>,
    pub subscription: Option<StripeRef>,
    pub setup_intent: Option<StripeRef>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<StripeMetadata>,
}

impl StripeCheckoutSession {
    /// Account reference, preferring `client_reference_id`.
    pub fn user_ref(&self) -> Option<String> {
        self.client_reference_id.clone().or_else(|| {
            self.metadata
                .as_ref()
                .and_then(|m| m.user_id.clone())
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSetupIntent {
    pub id: String,
    pub status: String,
    pub customer: Option<StripeRef>,
    pub payment_method: Option<StripeRef>,
}

#[derive(Debug, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: StripeRef,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub trial_start: Option<i64>,
    pub trial_end: Option<i64>,
    pub items: Option<StripeSubscriptionItems>,
}

impl StripeSubscription {
    /// Newer API versions moved the period onto subscription items.
    fn period(&self) -> (Option<i64>, Option<i64>) {
        let item = self.items.as_ref().and_then(|items| items.data.first());
        (
            self.current_period_start
                .or_else(|| item.and_then(|i| i.current_period_start)),
            self.current_period_end
                .or_else(|| item.and_then(|i| i.current_period_end)),
        )
    }

    pub fn to_snapshot(&self) -> SubscriptionSnapshot {
        let (start, end) = self.period();
        SubscriptionSnapshot {
            subscription_id: self.id.clone(),
            customer_id: self.customer.id().to_string(),
            status: SubscriptionStatus::from_stripe(&self.status),
            current_period_start: start.and_then(timestamp_to_datetime),
            current_period_end: end.and_then(timestamp_to_datetime),
            trial_start: self.trial_start.and_then(timestamp_to_datetime),
            trial_end: self.trial_end.and_then(timestamp_to_datetime),
            cancel_at_period_end: self.cancel_at_period_end,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: StripeRef,
    pub subscription: Option<StripeRef>,
    pub period_end: Option<i64>,
    pub lines: Option<StripeInvoiceLines>,
    pub parent: Option<StripeInvoiceParent>,
}

impl StripeInvoice {
    fn subscription_id(&self) -> Option<String> {
        self.subscription
            .as_ref()
            .map(|s| s.id().to_string())
            .or_else(|| {
                self.parent
                    .as_ref()
                    .and_then(|p| p.subscription_details.as_ref())
                    .and_then(|d| d.subscription.as_ref())
                    .map(|s| s.id().to_string())
            })
    }

    /// End of the paid period: latest line item period end, else the
    /// invoice's own `period_end`.
    fn paid_through(&self) -> Option<i64> {
        self.lines
            .as_ref()
            .and_then(|lines| lines.data.iter().filter_map(|l| l.period.as_ref()?.end).max())
            .or(self.period_end)
    }

    pub fn to_summary(&self) -> InvoiceSummary {
        InvoiceSummary {
            invoice_id: self.id.clone(),
            customer_id: self.customer.id().to_string(),
            subscription_id: self.subscription_id(),
            period_end: self.paid_through().and_then(timestamp_to_datetime),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoiceLines {
    pub data: Vec<StripeInvoiceLine>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoiceLine {
    pub period: Option<StripePeriod>,
}

#[derive(Debug, Deserialize)]
pub struct StripePeriod {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<StripeRef>,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Webhook Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: StripeWebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEventData {
    pub object: serde_json::Value,
}

impl StripeWebhookEvent {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Decodes the envelope into the closed event enum. Event types we act on
    /// must carry a well-formed object; anything else becomes `Unhandled`.
    pub fn into_webhook_event(self) -> Result<WebhookEvent, serde_json::Error> {
        let created = timestamp_to_datetime(self.created).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid created timestamp {}", self.created))
        })?;

        let object = self.data.object;
        let event = match self.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                let session: StripeCheckoutSession = serde_json::from_value(object)?;
                BillingEvent::CheckoutSessionCompleted(CheckoutCompletion {
                    user_ref: session.user_ref(),
                    session_id: session.id,
                    customer_id: session.customer.map(|c| c.id().to_string()),
                    subscription_id: session.subscription.map(|s| s.id().to_string()),
                })
            }
            SUBSCRIPTION_UPDATED => {
                let sub: StripeSubscription = serde_json::from_value(object)?;
                BillingEvent::SubscriptionUpdated(sub.to_snapshot())
            }
            SUBSCRIPTION_DELETED => {
                let sub: StripeSubscription = serde_json::from_value(object)?;
                BillingEvent::SubscriptionDeleted(sub.to_snapshot())
            }
            INVOICE_PAYMENT_FAILED => {
                let invoice: StripeInvoice = serde_json::from_value(object)?;
                BillingEvent::InvoicePaymentFailed(invoice.to_summary())
            }
            INVOICE_PAYMENT_SUCCEEDED => {
                let invoice: StripeInvoice = serde_json::from_value(object)?;
                BillingEvent::InvoicePaymentSucceeded(invoice.to_summary())
            }
            _ => BillingEvent::Unhandled {
                event_type: self.event_type,
            },
        };

        Ok(WebhookEvent {
            id: self.id,
            created,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    #[test]
    fn test_signature_roundtrip() {
        let now = Utc::now();
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign_webhook_payload(payload, SECRET, now.timestamp());

        assert!(StripeClient::verify_webhook_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn test_signature_rejects_tampered_body() {
        let now = Utc::now();
        let header = sign_webhook_payload(r#"{"id":"evt_1"}"#, SECRET, now.timestamp());

        let result =
            StripeClient::verify_webhook_signature(r#"{"id":"evt_2"}"#, &header, SECRET, now);
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }

    #[test]
    fn test_signature_rejects_old_timestamp() {
        let now = Utc::now();
        let payload = "{}";
        let header = sign_webhook_payload(payload, SECRET, now.timestamp() - 301);

        let result = StripeClient::verify_webhook_signature(payload, &header, SECRET, now);
        assert!(matches!(result, Err(AppError::InvalidSignature(_))));
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        let now = Utc::now();
        for header in ["", "garbage", "t=123", "v1=abc"] {
            assert!(
                StripeClient::verify_webhook_signature("{}", header, SECRET, now).is_err(),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_signature_accepts_any_matching_v1() {
        let now = Utc::now();
        let payload = "{}";
        let valid = sign_webhook_payload(payload, SECRET, now.timestamp());
        let (t, v1) = valid.split_once(",").unwrap();
        let header = format!("{t},v1=deadbeef,{v1}");

        assert!(StripeClient::verify_webhook_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn test_decode_subscription_updated_with_item_period() {
        let event = StripeWebhookEvent::parse(
            &json!({
                "id": "evt_1",
                "type": "customer.subscription.updated",
                "created": 1_700_000_000,
                "data": { "object": {
                    "id": "sub_1",
                    "customer": "cus_1",
                    "status": "past_due",
                    "cancel_at_period_end": true,
                    "items": { "data": [{
                        "id": "si_1",
                        "current_period_start": 1_700_000_000,
                        "current_period_end": 1_702_592_000
                    }]}
                }}
            })
            .to_string(),
        )
        .unwrap()
        .into_webhook_event()
        .unwrap();

        let BillingEvent::SubscriptionUpdated(sub) = event.event else {
            panic!("expected SubscriptionUpdated");
        };
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.current_period_end, timestamp_to_datetime(1_702_592_000));
    }

    #[test]
    fn test_decode_invoice_prefers_line_period() {
        let event = StripeWebhookEvent::parse(
            &json!({
                "id": "evt_2",
                "type": "invoice.payment_succeeded",
                "created": 1_700_000_000,
                "data": { "object": {
                    "id": "in_1",
                    "customer": "cus_1",
                    "period_end": 1_700_000_000,
                    "lines": { "data": [
                        { "period": { "start": 1_700_000_000, "end": 1_702_592_000 } }
                    ]},
                    "parent": { "subscription_details": { "subscription": "sub_9" } }
                }}
            })
            .to_string(),
        )
        .unwrap()
        .into_webhook_event()
        .unwrap();

        let BillingEvent::InvoicePaymentSucceeded(invoice) = event.event else {
            panic!("expected InvoicePaymentSucceeded");
        };
        assert_eq!(invoice.period_end, timestamp_to_datetime(1_702_592_000));
        assert_eq!(invoice.subscription_id.as_deref(), Some("sub_9"));
    }

    #[test]
    fn test_decode_checkout_falls_back_to_metadata() {
        let event = StripeWebhookEvent::parse(
            &json!({
                "id": "evt_3",
                "type": "checkout.session.completed",
                "created": 1_700_000_000,
                "data": { "object": {
                    "id": "cs_1",
                    "mode": "setup",
                    "customer": { "id": "cus_1", "object": "customer" },
                    "metadata": { "user_id": "abc" }
                }}
            })
            .to_string(),
        )
        .unwrap()
        .into_webhook_event()
        .unwrap();

        let BillingEvent::CheckoutSessionCompleted(session) = event.event else {
            panic!("expected CheckoutSessionCompleted");
        };
        assert_eq!(session.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(session.user_ref.as_deref(), Some("abc"));
        assert_eq!(session.subscription_id, None);
    }

    #[test]
    fn test_decode_unknown_type_is_unhandled() {
        let event = StripeWebhookEvent::parse(
            &json!({
                "id": "evt_4",
                "type": "charge.refunded",
                "created": 1_700_000_000,
                "data": { "object": { "whatever": true } }
            })
            .to_string(),
        )
        .unwrap()
        .into_webhook_event()
        .unwrap();

        assert_eq!(
            event.event,
            BillingEvent::Unhandled {
                event_type: "charge.refunded".into()
            }
        );
    }

    #[test]
    fn test_decode_malformed_object_fails() {
        let result = StripeWebhookEvent::parse(
            &json!({
                "id": "evt_5",
                "type": "customer.subscription.deleted",
                "created": 1_700_000_000,
                "data": { "object": { "id": "sub_1" } }
            })
            .to_string(),
        )
        .unwrap()
        .into_webhook_event();

        assert!(result.is_err());
    }
}
