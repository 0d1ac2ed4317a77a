use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::billing_provider::BillingProviderPort,
        use_cases::entitlement::{ApplyOutcome, EntitlementUseCases},
    },
    domain::entities::{
        billing_event::{BillingEvent, CheckoutCompletion, WebhookEvent},
        entitlement::Transition,
    },
};

// ============================================================================
// Repository Trait
// ============================================================================

/// Audit row for a processed provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEventRecord {
    pub provider_event_id: String,
    pub event_type: String,
    pub user_id: Option<Uuid>,
    pub outcome: String,
    pub event_created_at: DateTime<Utc>,
}

#[async_trait]
pub trait BillingEventRepo: Send + Sync {
    async fn exists(&self, provider_event_id: &str) -> AppResult<bool>;

    /// Inserting an already recorded event is a no-op.
    async fn record(&self, record: &BillingEventRecord) -> AppResult<()>;
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied { user_id: Uuid },
    Unchanged { user_id: Uuid },
    /// Event ID already processed.
    Replayed,
    /// Older than the newest event applied to the record.
    Stale { user_id: Uuid },
    /// Nothing to do; acknowledged without touching any record.
    Ignored { reason: &'static str },
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Applied { .. } => "applied",
            WebhookOutcome::Unchanged { .. } => "unchanged",
            WebhookOutcome::Replayed => "replayed",
            WebhookOutcome::Stale { .. } => "stale",
            WebhookOutcome::Ignored { .. } => "ignored",
        }
    }

    fn user_id(&self) -> Option<Uuid> {
        match self {
            WebhookOutcome::Applied { user_id }
            | WebhookOutcome::Unchanged { user_id }
            | WebhookOutcome::Stale { user_id } => Some(*user_id),
            WebhookOutcome::Replayed | WebhookOutcome::Ignored { .. } => None,
        }
    }
}

/// Determines if a webhook processing error should trigger a provider retry.
///
/// Returns `true` for transient failures, where answering 5xx lets the
/// provider redeliver. Returns `false` for conditions a retry will not fix;
/// those are logged and acknowledged.
pub fn is_retryable_error(error: &AppError) -> bool {
    match error {
        // Transient errors - retry may succeed
        AppError::Database(_) => true,
        AppError::Internal(_) => true,
        AppError::RateLimited => true,
        AppError::VersionConflict => true,
        AppError::Provider(_) => true,

        // Expected conditions - won't change with retry
        AppError::NotFound => false,
        AppError::InvalidInput(_) => false,
        AppError::InvalidSignature(_) => false,
        AppError::InvalidCredentials => false,
        AppError::SetupNotVerified(_) => false,
        AppError::BillingIdentityConflict(_) => false,
    }
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct WebhookUseCases {
    entitlements: Arc<EntitlementUseCases>,
    events: Arc<dyn BillingEventRepo>,
    billing: Arc<dyn BillingProviderPort>,
}

impl WebhookUseCases {
    pub fn new(
        entitlements: Arc<EntitlementUseCases>,
        events: Arc<dyn BillingEventRepo>,
        billing: Arc<dyn BillingProviderPort>,
    ) -> Self {
        Self {
            entitlements,
            events,
            billing,
        }
    }

    /// Applies one verified event. Errors are returned untouched; the caller
    /// decides between retry and acknowledgement via [`is_retryable_error`].
    pub async fn handle(&self, event: &WebhookEvent) -> AppResult<WebhookOutcome> {
        if self.events.exists(&event.id).await? {
            tracing::info!(
                event_id = %event.id,
                event_type = event.event.event_type(),
                "Billing event already processed"
            );
            return Ok(WebhookOutcome::Replayed);
        }

        let outcome = match &event.event {
            BillingEvent::CheckoutSessionCompleted(session) => {
                self.on_checkout_completed(event, session).await?
            }
            BillingEvent::SubscriptionUpdated(sub) => {
                self.apply_for_customer(
                    event,
                    &sub.customer_id,
                    Transition::SubscriptionUpdated(sub.clone()),
                )
                .await?
            }
            BillingEvent::SubscriptionDeleted(sub) => {
                self.apply_for_customer(
                    event,
                    &sub.customer_id,
                    Transition::SubscriptionDeleted(sub.clone()),
                )
                .await?
            }
            BillingEvent::InvoicePaymentFailed(invoice) => {
                self.apply_for_customer(
                    event,
                    &invoice.customer_id,
                    Transition::PaymentFailed {
                        subscription_id: invoice.subscription_id.clone(),
                    },
                )
                .await?
            }
            BillingEvent::InvoicePaymentSucceeded(invoice) => {
                self.apply_for_customer(
                    event,
                    &invoice.customer_id,
                    Transition::PaymentSucceeded {
                        subscription_id: invoice.subscription_id.clone(),
                        period_end: invoice.period_end,
                    },
                )
                .await?
            }
            BillingEvent::Unhandled { event_type } => {
                tracing::debug!(event_id = %event.id, event_type = %event_type, "Unhandled webhook event type");
                return Ok(WebhookOutcome::Ignored {
                    reason: "unhandled event type",
                });
            }
        };

        self.events
            .record(&BillingEventRecord {
                provider_event_id: event.id.clone(),
                event_type: event.event.event_type().to_string(),
                user_id: outcome.user_id(),
                outcome: outcome.as_str().to_string(),
                event_created_at: event.created,
            })
            .await?;

        Ok(outcome)
    }

    async fn on_checkout_completed(
        &self,
        event: &WebhookEvent,
        session: &CheckoutCompletion,
    ) -> AppResult<WebhookOutcome> {
        let Some(customer_id) = session.customer_id.as_deref() else {
            tracing::debug!(
                event_id = %event.id,
                session_id = %session.session_id,
                "checkout.session.completed without customer"
            );
            return Ok(WebhookOutcome::Ignored {
                reason: "checkout session without customer",
            });
        };

        let user_id = match session.user_ref.as_deref().map(Uuid::parse_str) {
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => {
                tracing::debug!(
                    event_id = %event.id,
                    user_ref = ?session.user_ref,
                    retryable = false,
                    "Invalid user reference on checkout session"
                );
                None
            }
            None => None,
        };

        let user_id = match user_id {
            Some(id) => id,
            None => match self.entitlements.find_by_customer(customer_id).await? {
                Some(record) => record.user_id,
                None => {
                    tracing::info!(
                        event_id = %event.id,
                        customer_id,
                        "Checkout completed for unknown user"
                    );
                    return Ok(WebhookOutcome::Ignored {
                        reason: "unknown user",
                    });
                }
            },
        };

        let subscription = match session.subscription_id.as_deref() {
            Some(subscription_id) => match self.billing.get_subscription(subscription_id).await? {
                Some(sub) => Some(sub),
                None => {
                    tracing::warn!(
                        event_id = %event.id,
                        subscription_id,
                        "Checkout subscription not found at provider"
                    );
                    return Ok(WebhookOutcome::Ignored {
                        reason: "subscription not found",
                    });
                }
            },
            None => None,
        };

        let transition = Transition::CheckoutCompleted {
            customer_id: customer_id.to_string(),
            subscription,
        };

        self.apply_for_user(event, user_id, transition).await
    }

    async fn apply_for_customer(
        &self,
        event: &WebhookEvent,
        customer_id: &str,
        transition: Transition,
    ) -> AppResult<WebhookOutcome> {
        let Some(record) = self.entitlements.find_by_customer(customer_id).await? else {
            tracing::info!(
                event_id = %event.id,
                event_type = event.event.event_type(),
                customer_id,
                "Billing event for unknown customer"
            );
            return Ok(WebhookOutcome::Ignored {
                reason: "unknown customer",
            });
        };

        self.apply_for_user(event, record.user_id, transition).await
    }

    async fn apply_for_user(
        &self,
        event: &WebhookEvent,
        user_id: Uuid,
        transition: Transition,
    ) -> AppResult<WebhookOutcome> {
        let outcome = match self
            .entitlements
            .apply(user_id, &transition, Some(event.created))
            .await
        {
            Err(AppError::NotFound) => {
                tracing::info!(event_id = %event.id, %user_id, "No entitlement record for user");
                return Ok(WebhookOutcome::Ignored {
                    reason: "unknown user",
                });
            }
            other => other?,
        };

        let outcome = match outcome {
            ApplyOutcome::Applied(_) => WebhookOutcome::Applied { user_id },
            ApplyOutcome::Unchanged(_) => WebhookOutcome::Unchanged { user_id },
            ApplyOutcome::Stale => WebhookOutcome::Stale { user_id },
        };

        tracing::info!(
            event_id = %event.id,
            event_type = event.event.event_type(),
            %user_id,
            outcome = outcome.as_str(),
            "Billing event processed"
        );

        Ok(outcome)
    }
}
