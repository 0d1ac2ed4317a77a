use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::billing_provider::{
        BillingProviderPort, CheckoutSessionInfo, CheckoutSessionResult, CheckoutSessionStatus,
        CheckoutUrls, CustomerId, SetupIntentInfo, SetupIntentStatus,
    },
    domain::entities::billing_event::SubscriptionSnapshot,
    infra::stripe_client::{StripeCheckoutSession, StripeClient},
};

/// Adapter that wraps StripeClient to implement BillingProviderPort.
///
/// Holds the single premium price the service sells.
#[derive(Clone)]
pub struct StripeBillingAdapter {
    client: StripeClient,
    price_id: String,
}

impl StripeBillingAdapter {
    pub fn new(secret_key: String, price_id: String) -> Self {
        Self {
            client: StripeClient::new(secret_key),
            price_id,
        }
    }

    fn hosted_url(session: StripeCheckoutSession) -> AppResult<CheckoutSessionResult> {
        let url = session
            .url
            .ok_or_else(|| AppError::Provider("Checkout session has no URL".into()))?;
        Ok(CheckoutSessionResult {
            session_id: session.id,
            url,
        })
    }
}

#[async_trait]
impl BillingProviderPort for StripeBillingAdapter {
    async fn create_customer(&self, email: &str, user_id: Uuid) -> AppResult<CustomerId> {
        let customer = self
            .client
            .create_customer(email, &user_id.to_string())
            .await?;
        Ok(CustomerId::new(customer.id))
    }

    async fn create_setup_checkout(
        &self,
        customer: &CustomerId,
        user_id: Uuid,
        urls: &CheckoutUrls,
    ) -> AppResult<CheckoutSessionResult> {
        let session = self
            .client
            .create_setup_checkout_session(
                customer.as_str(),
                &user_id.to_string(),
                &urls.success_url,
                &urls.cancel_url,
            )
            .await?;
        Self::hosted_url(session)
    }

    async fn create_subscription_checkout(
        &self,
        customer: &CustomerId,
        user_id: Uuid,
        trial_days: u32,
        urls: &CheckoutUrls,
    ) -> AppResult<CheckoutSessionResult> {
        let session = self
            .client
            .create_subscription_checkout_session(
                customer.as_str(),
                &self.price_id,
                &user_id.to_string(),
                &urls.success_url,
                &urls.cancel_url,
                trial_days,
            )
            .await?;
        Self::hosted_url(session)
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<CheckoutSessionInfo>> {
        let Some(session) = self.client.get_checkout_session(session_id).await? else {
            return Ok(None);
        };

        Ok(Some(CheckoutSessionInfo {
            status: CheckoutSessionStatus::from_stripe(session.status.as_deref()),
            user_ref: session.user_ref(),
            customer_id: session.customer.map(|c| CustomerId::new(c.id())),
            subscription_id: session.subscription.map(|s| s.id().to_string()),
            setup_intent_id: session.setup_intent.map(|s| s.id().to_string()),
            session_id: session.id,
        }))
    }

    async fn get_setup_intent(&self, setup_intent_id: &str) -> AppResult<Option<SetupIntentInfo>> {
        let Some(intent) = self.client.get_setup_intent(setup_intent_id).await? else {
            return Ok(None);
        };

        Ok(Some(SetupIntentInfo {
            status: SetupIntentStatus::from_stripe(&intent.status),
            customer_id: intent.customer.map(|c| CustomerId::new(c.id())),
            payment_method_id: intent.payment_method.map(|p| p.id().to_string()),
            setup_intent_id: intent.id,
        }))
    }

    async fn set_default_payment_method(
        &self,
        customer: &CustomerId,
        payment_method_id: &str,
    ) -> AppResult<()> {
        self.client
            .set_default_payment_method(customer.as_str(), payment_method_id)
            .await?;
        Ok(())
    }

    async fn create_trial_subscription(
        &self,
        customer: &CustomerId,
        payment_method_id: &str,
        trial_days: u32,
        idempotency_key: &str,
    ) -> AppResult<SubscriptionSnapshot> {
        let subscription = self
            .client
            .create_subscription(
                customer.as_str(),
                &self.price_id,
                payment_method_id,
                trial_days,
                idempotency_key,
            )
            .await?;
        Ok(subscription.to_snapshot())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<SubscriptionSnapshot>> {
        Ok(self
            .client
            .get_subscription(subscription_id)
            .await?
            .map(|s| s.to_snapshot()))
    }

    async fn create_portal_session(
        &self,
        customer: &CustomerId,
        return_url: &str,
    ) -> AppResult<String> {
        let session = self
            .client
            .create_portal_session(customer.as_str(), return_url)
            .await?;
        Ok(session.url)
    }
}
