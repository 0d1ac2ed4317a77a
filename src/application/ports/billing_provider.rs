use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::billing_event::SubscriptionSnapshot};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a customer in the billing provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URLs for checkout redirects
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of creating a hosted checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionResult {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutSessionStatus {
    Open,
    Complete,
    Expired,
}

impl CheckoutSessionStatus {
    pub fn from_stripe(s: Option<&str>) -> Self {
        match s {
            Some("complete") => CheckoutSessionStatus::Complete,
            Some("expired") => CheckoutSessionStatus::Expired,
            _ => CheckoutSessionStatus::Open,
        }
    }
}

/// Checkout session as retrieved from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionInfo {
    pub session_id: String,
    pub status: CheckoutSessionStatus,
    pub customer_id: Option<CustomerId>,
    pub subscription_id: Option<String>,
    pub setup_intent_id: Option<String>,
    /// `client_reference_id`, falling back to `metadata.user_id`.
    pub user_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupIntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Canceled,
}

impl SetupIntentStatus {
    /// Unknown statuses are treated as still needing a payment method.
    pub fn from_stripe(s: &str) -> Self {
        match s {
            "succeeded" => SetupIntentStatus::Succeeded,
            "processing" => SetupIntentStatus::Processing,
            "requires_confirmation" => SetupIntentStatus::RequiresConfirmation,
            "requires_action" => SetupIntentStatus::RequiresAction,
            "canceled" => SetupIntentStatus::Canceled,
            _ => SetupIntentStatus::RequiresPaymentMethod,
        }
    }
}

/// Setup intent as retrieved from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupIntentInfo {
    pub setup_intent_id: String,
    pub status: SetupIntentStatus,
    pub customer_id: Option<CustomerId>,
    pub payment_method_id: Option<String>,
}

// ============================================================================
// Billing Provider Port
// ============================================================================

/// Billing provider port. Implementations shape provider payloads only and
/// never touch entitlement state.
///
/// Lookups return `Ok(None)` when the provider reports the object missing.
#[async_trait]
pub trait BillingProviderPort: Send + Sync {
    /// Create a customer tagged with the account ID.
    async fn create_customer(&self, email: &str, user_id: Uuid) -> AppResult<CustomerId>;

    /// Setup-mode checkout that only collects a payment method.
    async fn create_setup_checkout(
        &self,
        customer: &CustomerId,
        user_id: Uuid,
        urls: &CheckoutUrls,
    ) -> AppResult<CheckoutSessionResult>;

    /// Subscription-mode checkout for the premium price.
    async fn create_subscription_checkout(
        &self,
        customer: &CustomerId,
        user_id: Uuid,
        trial_days: u32,
        urls: &CheckoutUrls,
    ) -> AppResult<CheckoutSessionResult>;

    async fn get_checkout_session(&self, session_id: &str)
    -> AppResult<Option<CheckoutSessionInfo>>;

    async fn get_setup_intent(&self, setup_intent_id: &str) -> AppResult<Option<SetupIntentInfo>>;

    async fn set_default_payment_method(
        &self,
        customer: &CustomerId,
        payment_method_id: &str,
    ) -> AppResult<()>;

    /// Start the premium subscription with a trial of `trial_days`.
    ///
    /// Calls sharing an `idempotency_key` create at most one subscription and
    /// return the same result.
    async fn create_trial_subscription(
        &self,
        customer: &CustomerId,
        payment_method_id: &str,
        trial_days: u32,
        idempotency_key: &str,
    ) -> AppResult<SubscriptionSnapshot>;

    async fn get_subscription(&self, subscription_id: &str)
    -> AppResult<Option<SubscriptionSnapshot>>;

    /// Returns the hosted portal URL.
    async fn create_portal_session(&self, customer: &CustomerId, return_url: &str)
    -> AppResult<String>;
}
