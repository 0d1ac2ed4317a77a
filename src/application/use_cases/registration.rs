//! Account registration and the hosted checkout flows.
//!
//! Registration is two calls. The first creates the account, a billing
//! customer and a setup-mode checkout. The second runs after the browser
//! returns from checkout and re-verifies everything with the provider before
//! starting the trial; nothing the client reports is trusted.

use std::sync::Arc;

use chrono::Utc;
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::billing_provider::{
            BillingProviderPort, CheckoutSessionStatus, CheckoutUrls, CustomerId,
            SetupIntentStatus,
        },
        use_cases::{
            account::AccountRepo,
            entitlement::{ApplyOutcome, EntitlementUseCases},
        },
        validators::{is_valid_email, normalize_display_name},
    },
    domain::entities::{
        account::normalize_email,
        entitlement::{Entitlement, Transition},
        subscription_status::SubscriptionStatus,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationStarted {
    pub user_id: Uuid,
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStarted {
    pub session_id: String,
    pub url: String,
}

pub struct RegistrationUseCases {
    accounts: Arc<dyn AccountRepo>,
    entitlements: Arc<EntitlementUseCases>,
    billing: Arc<dyn BillingProviderPort>,
    app_origin: Url,
    trial_days: u32,
}

impl RegistrationUseCases {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        entitlements: Arc<EntitlementUseCases>,
        billing: Arc<dyn BillingProviderPort>,
        app_origin: Url,
        trial_days: u32,
    ) -> Self {
        Self {
            accounts,
            entitlements,
            billing,
            app_origin,
            trial_days,
        }
    }

    pub async fn create_registration(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> AppResult<RegistrationStarted> {
        if !is_valid_email(email) {
            return Err(AppError::InvalidInput("Invalid email address".into()));
        }
        let email = normalize_email(email);
        let display_name = normalize_display_name(display_name).map_err(AppError::InvalidInput)?;

        let (account, record) = match self.accounts.get_by_email(&email).await? {
            Some(existing) => {
                let record = self
                    .entitlements
                    .get(existing.id)
                    .await?
                    .ok_or(AppError::NotFound)?;
                if record.payment_method_attached {
                    return Err(AppError::InvalidInput(
                        "An account with this email already exists".into(),
                    ));
                }
                // Earlier attempt never reached a completed setup checkout.
                tracing::info!(user_id = %existing.id, "Resuming unfinished registration");
                (existing, record)
            }
            None => {
                self.accounts
                    .create_with_entitlement(&email, display_name.as_deref(), Utc::now())
                    .await?
            }
        };

        let customer = match record.customer_id.as_deref() {
            Some(id) => CustomerId::new(id),
            None => {
                let customer = self.billing.create_customer(&email, account.id).await?;
                self.entitlements
                    .apply(
                        account.id,
                        &Transition::CustomerAttached {
                            customer_id: customer.to_string(),
                        },
                        None,
                    )
                    .await?;
                customer
            }
        };

        let session = self
            .billing
            .create_setup_checkout(&customer, account.id, &self.registration_urls())
            .await?;

        tracing::info!(
            user_id = %account.id,
            customer_id = %customer,
            session_id = %session.session_id,
            "Registration started"
        );

        Ok(RegistrationStarted {
            user_id: account.id,
            session_id: session.session_id,
            url: session.url,
        })
    }

    /// Verifies the completed setup checkout with the provider and starts the
    /// trial. Any mismatch fails with `SetupNotVerified` before a write.
    pub async fn complete_registration(
        &self,
        session_id: &str,
        setup_intent_id: &str,
    ) -> AppResult<Entitlement> {
        let session = self
            .billing
            .get_checkout_session(session_id)
            .await?
            .ok_or_else(|| AppError::SetupNotVerified("Unknown checkout session".into()))?;

        if session.status != CheckoutSessionStatus::Complete {
            return Err(AppError::SetupNotVerified(
                "Checkout session is not complete".into(),
            ));
        }

        if session.setup_intent_id.as_deref() != Some(setup_intent_id) {
            return Err(AppError::SetupNotVerified(
                "Setup intent does not belong to this checkout session".into(),
            ));
        }

        let user_id = session
            .user_ref
            .as_deref()
            .and_then(|r| Uuid::parse_str(r).ok())
            .ok_or_else(|| {
                AppError::SetupNotVerified("Checkout session has no account reference".into())
            })?;

        if self.accounts.get_by_id(user_id).await?.is_none() {
            return Err(AppError::SetupNotVerified(
                "Checkout session references an unknown account".into(),
            ));
        }

        let customer = session.customer_id.ok_or_else(|| {
            AppError::SetupNotVerified("Checkout session has no customer".into())
        })?;

        let record = self
            .entitlements
            .get(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if record
            .customer_id
            .as_deref()
            .is_some_and(|c| c != customer.as_str())
        {
            return Err(AppError::SetupNotVerified(
                "Checkout customer does not match the account".into(),
            ));
        }

        // Double submit after success: hand back the existing trial.
        if record.payment_method_attached && record.subscription_id.is_some() {
            tracing::info!(%user_id, "Registration already completed");
            return Ok(record);
        }

        let intent = self
            .billing
            .get_setup_intent(setup_intent_id)
            .await?
            .ok_or_else(|| AppError::SetupNotVerified("Unknown setup intent".into()))?;

        if intent.status != SetupIntentStatus::Succeeded {
            return Err(AppError::SetupNotVerified(format!(
                "Setup intent status is {:?}",
                intent.status
            )));
        }

        if intent.customer_id.as_ref() != Some(&customer) {
            return Err(AppError::SetupNotVerified(
                "Setup intent belongs to a different customer".into(),
            ));
        }

        let payment_method_id = intent.payment_method_id.ok_or_else(|| {
            AppError::SetupNotVerified("Setup intent has no payment method".into())
        })?;

        self.billing
            .set_default_payment_method(&customer, &payment_method_id)
            .await?;

        // Keyed on the setup intent so a retry after a failed write, or a
        // concurrent submit, gets the same subscription back.
        let subscription = self
            .billing
            .create_trial_subscription(
                &customer,
                &payment_method_id,
                self.trial_days,
                &format!("trial_{setup_intent_id}"),
            )
            .await?;

        let outcome = self
            .entitlements
            .apply(
                user_id,
                &Transition::TrialStarted {
                    customer_id: customer.to_string(),
                    subscription,
                },
                None,
            )
            .await?;

        let record = match outcome {
            ApplyOutcome::Applied(record) | ApplyOutcome::Unchanged(record) => record,
            ApplyOutcome::Stale => {
                return Err(AppError::Internal("Trial start reported as stale".into()));
            }
        };

        tracing::info!(
            %user_id,
            customer_id = %customer,
            subscription_id = ?record.subscription_id,
            trial_end = ?record.trial_end_date,
            "Registration completed, trial started"
        );

        Ok(record)
    }

    /// Subscription checkout for an existing account. A trial is offered
    /// only to accounts that never had one.
    pub async fn create_upgrade_checkout(&self, user_id: Uuid) -> AppResult<CheckoutStarted> {
        let account = self
            .accounts
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let record = self
            .entitlements
            .get(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if self.entitlements.policy().is_premium(&record, Utc::now()) {
            return Err(AppError::InvalidInput("Account is already premium".into()));
        }

        // Only a canceled subscription may be replaced by a new checkout.
        if record.subscription_id.is_some() && record.status != SubscriptionStatus::Canceled {
            return Err(AppError::InvalidInput(
                "Account has an open subscription, manage it from the billing portal".into(),
            ));
        }

        let customer = match record.customer_id.as_deref() {
            Some(id) => CustomerId::new(id),
            None => {
                let customer = self.billing.create_customer(&account.email, user_id).await?;
                self.entitlements
                    .apply(
                        user_id,
                        &Transition::CustomerAttached {
                            customer_id: customer.to_string(),
                        },
                        None,
                    )
                    .await?;
                customer
            }
        };

        let trial_days = if record.trial_start_date.is_some() {
            0
        } else {
            self.trial_days
        };

        let session = self
            .billing
            .create_subscription_checkout(&customer, user_id, trial_days, &self.upgrade_urls())
            .await?;

        Ok(CheckoutStarted {
            session_id: session.session_id,
            url: session.url,
        })
    }

    /// Hosted billing portal for accounts that have a billing customer.
    pub async fn create_portal_session(&self, user_id: Uuid) -> AppResult<String> {
        let record = self
            .entitlements
            .get(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let customer = record
            .customer_id
            .map(CustomerId::new)
            .ok_or_else(|| AppError::InvalidInput("No billing account for this user".into()))?;

        self.billing
            .create_portal_session(&customer, &self.app_url("/account"))
            .await
    }

    fn app_url(&self, path: &str) -> String {
        self.app_origin
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.app_origin, path.trim_start_matches('/')))
    }

    fn registration_urls(&self) -> CheckoutUrls {
        CheckoutUrls {
            success_url: format!(
                "{}?session_id={{CHECKOUT_SESSION_ID}}",
                self.app_url("/register/complete")
            ),
            cancel_url: format!("{}?canceled=true", self.app_url("/register")),
        }
    }

    fn upgrade_urls(&self) -> CheckoutUrls {
        CheckoutUrls {
            success_url: format!(
                "{}?checkout=success&session_id={{CHECKOUT_SESSION_ID}}",
                self.app_url("/account")
            ),
            cancel_url: format!("{}?checkout=canceled", self.app_url("/account")),
        }
    }
}
