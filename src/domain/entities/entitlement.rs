//! Per-user entitlement record, the premium evaluator and the lifecycle
//! transitions that billing events drive.
//!
//! Transitions are pure: [`Entitlement::apply`] returns the next state and
//! the store decides whether it can be committed. Access checks always go
//! through [`EntitlementPolicy::is_premium`] with an explicit `now`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::{
    billing_event::SubscriptionSnapshot, subscription_status::SubscriptionStatus, tier::Tier,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub user_id: Uuid,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub trial_start_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub payment_method_attached: bool,
    /// Creation time of the newest provider event applied to this record.
    pub last_event_at: Option<DateTime<Utc>>,
    /// Incremented on every committed write; used for compare-and-set.
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Refusal to overwrite a billing identifier that is already set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is already {current}, refusing to rebind to {incoming}")]
pub struct IdentityConflict {
    pub field: &'static str,
    pub current: String,
    pub incoming: String,
}

/// State change requested by a billing event or by registration completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Customer created for the account before any checkout.
    CustomerAttached { customer_id: String },
    /// Checkout finished. A setup-mode session carries no subscription and
    /// only binds the customer.
    CheckoutCompleted {
        customer_id: String,
        subscription: Option<SubscriptionSnapshot>,
    },
    SubscriptionUpdated(SubscriptionSnapshot),
    SubscriptionDeleted(SubscriptionSnapshot),
    PaymentFailed {
        subscription_id: Option<String>,
    },
    PaymentSucceeded {
        subscription_id: Option<String>,
        period_end: Option<DateTime<Utc>>,
    },
    /// Registration completed after the setup intent was verified and the
    /// trial subscription was created.
    TrialStarted {
        customer_id: String,
        subscription: SubscriptionSnapshot,
    },
}

impl Transition {
    /// Deletions are terminal and are applied regardless of ordering.
    pub fn is_deletion(&self) -> bool {
        matches!(self, Transition::SubscriptionDeleted(_))
    }
}

/// Tier implied by a provider status. `past_due` keeps whatever tier the
/// record already has.
pub fn tier_for(status: SubscriptionStatus, current: Tier) -> Tier {
    match status {
        SubscriptionStatus::Trialing | SubscriptionStatus::Active => Tier::Premium,
        SubscriptionStatus::Canceled | SubscriptionStatus::Incomplete => Tier::Free,
        SubscriptionStatus::PastDue => current,
    }
}

impl Entitlement {
    /// Default record created alongside a new account.
    pub fn new_free(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            tier: Tier::Free,
            status: SubscriptionStatus::Active,
            customer_id: None,
            subscription_id: None,
            trial_start_date: None,
            trial_end_date: None,
            subscription_start_date: None,
            subscription_end_date: None,
            cancel_at_period_end: false,
            payment_method_attached: false,
            last_event_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when an event created at `event_at` predates the newest event
    /// already applied.
    pub fn is_stale(&self, event_at: DateTime<Utc>) -> bool {
        self.last_event_at.is_some_and(|last| event_at < last)
    }

    /// Computes the record that results from applying `transition`.
    ///
    /// `event_at` is the provider creation time of the triggering event and
    /// advances `last_event_at`; pass `None` for transitions that do not
    /// originate from a webhook. Version and timestamps are left to the store.
    pub fn apply(
        &self,
        transition: &Transition,
        event_at: Option<DateTime<Utc>>,
    ) -> Result<Entitlement, IdentityConflict> {
        let mut next = self.clone();

        match transition {
            Transition::CustomerAttached { customer_id } => {
                next.bind_customer(customer_id)?;
            }
            Transition::CheckoutCompleted {
                customer_id,
                subscription,
            } => {
                next.bind_customer(customer_id)?;
                if let Some(sub) = subscription {
                    next.bind_subscription(&sub.subscription_id)?;
                    next.take_snapshot(sub);
                }
            }
            Transition::SubscriptionUpdated(sub) => {
                next.bind_customer(&sub.customer_id)?;
                next.bind_subscription(&sub.subscription_id)?;
                next.take_snapshot(sub);
            }
            Transition::SubscriptionDeleted(sub) => {
                next.bind_customer(&sub.customer_id)?;
                // A late deletion of a replaced subscription must not cancel
                // the current one.
                if let Some(current) = next.subscription_id.as_deref()
                    && current != sub.subscription_id
                {
                    return Err(IdentityConflict {
                        field: "subscription_id",
                        current: current.to_string(),
                        incoming: sub.subscription_id.clone(),
                    });
                }
                next.status = SubscriptionStatus::Canceled;
                next.tier = Tier::Free;
                next.cancel_at_period_end = false;
                if sub.current_period_end.is_some() {
                    next.subscription_end_date = sub.current_period_end;
                }
            }
            Transition::PaymentFailed { subscription_id } => {
                if let Some(id) = subscription_id {
                    next.bind_subscription(id)?;
                }
                next.status = SubscriptionStatus::PastDue;
            }
            Transition::PaymentSucceeded {
                subscription_id,
                period_end,
            } => {
                if let Some(id) = subscription_id {
                    next.bind_subscription(id)?;
                }
                next.status = SubscriptionStatus::Active;
                next.tier = Tier::Premium;
                if period_end.is_some() {
                    next.subscription_end_date = *period_end;
                }
            }
            Transition::TrialStarted {
                customer_id,
                subscription,
            } => {
                next.bind_customer(customer_id)?;
                next.bind_subscription(&subscription.subscription_id)?;
                next.take_snapshot(subscription);
                next.payment_method_attached = true;
            }
        }

        if let Some(at) = event_at {
            next.last_event_at = Some(match next.last_event_at {
                Some(last) if last > at => last,
                _ => at,
            });
        }

        Ok(next)
    }

    fn bind_customer(&mut self, incoming: &str) -> Result<(), IdentityConflict> {
        bind_once("customer_id", &mut self.customer_id, incoming)
    }

    /// Binds the subscription ID. A canceled record may move to a new
    /// subscription (resubscribe); any other status keeps the bound one.
    fn bind_subscription(&mut self, incoming: &str) -> Result<(), IdentityConflict> {
        if self.status == SubscriptionStatus::Canceled
            && self.subscription_id.as_deref().is_some_and(|c| c != incoming)
        {
            self.subscription_id = Some(incoming.to_string());
            return Ok(());
        }
        bind_once("subscription_id", &mut self.subscription_id, incoming)
    }

    /// Overwrites lifecycle fields from a provider snapshot. Absent dates in
    /// the snapshot keep the values already stored.
    fn take_snapshot(&mut self, sub: &SubscriptionSnapshot) {
        self.status = sub.status;
        self.tier = tier_for(sub.status, self.tier);
        self.cancel_at_period_end = sub.cancel_at_period_end;
        if sub.trial_start.is_some() {
            self.trial_start_date = sub.trial_start;
        }
        if sub.trial_end.is_some() {
            self.trial_end_date = sub.trial_end;
        }
        if sub.current_period_start.is_some() {
            self.subscription_start_date = sub.current_period_start;
        }
        if sub.current_period_end.is_some() {
            self.subscription_end_date = sub.current_period_end;
        }
    }
}

fn bind_once(
    field: &'static str,
    slot: &mut Option<String>,
    incoming: &str,
) -> Result<(), IdentityConflict> {
    match slot {
        Some(current) if current != incoming => Err(IdentityConflict {
            field,
            current: current.clone(),
            incoming: incoming.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            *slot = Some(incoming.to_string());
            Ok(())
        }
    }
}

/// Access rules applied on top of a stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntitlementPolicy {
    /// How long a `past_due` record keeps access after its period end.
    /// `None` means no grace at all.
    pub past_due_grace: Option<Duration>,
}

impl EntitlementPolicy {
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            past_due_grace: Some(grace),
        }
    }

    pub fn is_premium(&self, record: &Entitlement, now: DateTime<Utc>) -> bool {
        if !record.tier.is_premium() {
            return false;
        }

        match record.status {
            SubscriptionStatus::Trialing => record.trial_end_date.is_some_and(|end| now < end),
            SubscriptionStatus::Active => record.subscription_end_date.is_none_or(|end| now < end),
            SubscriptionStatus::PastDue => match (self.past_due_grace, record.subscription_end_date) {
                (Some(grace), Some(end)) => now < end + grace,
                _ => false,
            },
            SubscriptionStatus::Canceled | SubscriptionStatus::Incomplete => false,
        }
    }
}

/// Premium check under the default policy (no past-due grace).
pub fn is_premium(record: &Entitlement, now: DateTime<Utc>) -> bool {
    EntitlementPolicy::default().is_premium(record, now)
}
