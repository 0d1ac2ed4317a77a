use std::sync::Arc;

use crate::{
    infra::{RateLimiterTrait, config::AppConfig},
    use_cases::{
        entitlement::EntitlementUseCases, registration::RegistrationUseCases,
        webhook::WebhookUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub entitlement_use_cases: Arc<EntitlementUseCases>,
    pub webhook_use_cases: Arc<WebhookUseCases>,
    pub registration_use_cases: Arc<RegistrationUseCases>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}
