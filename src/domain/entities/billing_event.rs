//! Provider-neutral billing lifecycle events.
//!
//! The webhook adapter decodes the provider envelope into [`WebhookEvent`];
//! everything downstream matches on the closed [`BillingEvent`] enum.
//! Event types we do not act on land in [`BillingEvent::Unhandled`] and are
//! acknowledged without touching any record.

use chrono::{DateTime, Utc};

use super::subscription_status::SubscriptionStatus;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";

/// Snapshot of a provider subscription object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompletion {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Account ID passed through `client_reference_id` or `metadata.user_id`.
    pub user_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSummary {
    pub invoice_id: String,
    pub customer_id: String,
    pub subscription_id: Option<String>,
    /// End of the billing period the invoice pays for.
    pub period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutSessionCompleted(CheckoutCompletion),
    SubscriptionUpdated(SubscriptionSnapshot),
    SubscriptionDeleted(SubscriptionSnapshot),
    InvoicePaymentFailed(InvoiceSummary),
    InvoicePaymentSucceeded(InvoiceSummary),
    Unhandled { event_type: String },
}

impl BillingEvent {
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutSessionCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            BillingEvent::SubscriptionUpdated(_) => SUBSCRIPTION_UPDATED,
            BillingEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            BillingEvent::InvoicePaymentFailed(_) => INVOICE_PAYMENT_FAILED,
            BillingEvent::InvoicePaymentSucceeded(_) => INVOICE_PAYMENT_SUCCEEDED,
            BillingEvent::Unhandled { event_type } => event_type,
        }
    }

    /// Billing customer the event refers to, if the payload names one.
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            BillingEvent::CheckoutSessionCompleted(session) => session.customer_id.as_deref(),
            BillingEvent::SubscriptionUpdated(sub) | BillingEvent::SubscriptionDeleted(sub) => {
                Some(&sub.customer_id)
            }
            BillingEvent::InvoicePaymentFailed(inv) | BillingEvent::InvoicePaymentSucceeded(inv) => {
                Some(&inv.customer_id)
            }
            BillingEvent::Unhandled { .. } => None,
        }
    }
}

/// A verified, decoded webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Provider-assigned event ID, stable across redeliveries.
    pub id: String,
    /// When the provider created the event.
    pub created: DateTime<Utc>,
    pub event: BillingEvent,
}
