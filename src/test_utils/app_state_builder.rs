//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::jwt,
    domain::entities::{
        entitlement::{Entitlement, EntitlementPolicy},
        tier::Tier,
    },
    infra::config::AppConfig,
    test_utils::{
        InMemoryAccountRepo, InMemoryBillingEventRepo, InMemoryEntitlementRepo,
        InMemoryRateLimiter, StubBillingProvider,
    },
    use_cases::{
        entitlement::EntitlementUseCases, registration::RegistrationUseCases,
        webhook::WebhookUseCases,
    },
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Handles on the in-memory dependencies behind a built `AppState`.
pub struct TestMocks {
    pub entitlements: Arc<InMemoryEntitlementRepo>,
    pub accounts: Arc<InMemoryAccountRepo>,
    pub events: Arc<InMemoryBillingEventRepo>,
    pub billing: Arc<StubBillingProvider>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let record = create_test_entitlement(|e| e.customer_id = Some("cus_1".into()));
///
/// let (app_state, mocks) = TestAppStateBuilder::new()
///     .with_entitlement(record)
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    entitlements: Vec<Entitlement>,
    policy: EntitlementPolicy,
    trial_days: u32,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            entitlements: vec![],
            policy: EntitlementPolicy::default(),
            trial_days: 7,
        }
    }

    /// Add an entitlement record to the test state.
    pub fn with_entitlement(mut self, record: Entitlement) -> Self {
        self.entitlements.push(record);
        self
    }

    pub fn with_policy(mut self, policy: EntitlementPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the AppState with all configured mocks.
    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the AppState and return the mocks behind it for assertions.
    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let entitlements = Arc::new(InMemoryEntitlementRepo::with_records(self.entitlements));
        let accounts = Arc::new(InMemoryAccountRepo::new(entitlements.clone()));
        let events = Arc::new(InMemoryBillingEventRepo::new());
        let billing = Arc::new(StubBillingProvider::new());

        let config = test_config(self.trial_days);

        let entitlement_use_cases =
            Arc::new(EntitlementUseCases::new(entitlements.clone(), self.policy));

        let webhook_use_cases = Arc::new(WebhookUseCases::new(
            entitlement_use_cases.clone(),
            events.clone(),
            billing.clone(),
        ));

        let registration_use_cases = Arc::new(RegistrationUseCases::new(
            accounts.clone(),
            entitlement_use_cases.clone(),
            billing.clone(),
            config.app_origin.clone(),
            config.trial_days,
        ));

        let app_state = AppState {
            config: Arc::new(config),
            entitlement_use_cases,
            webhook_use_cases,
            registration_use_cases,
            rate_limiter: Arc::new(InMemoryRateLimiter::permissive()),
        };

        (
            app_state,
            TestMocks {
                entitlements,
                accounts,
                events,
                billing,
            },
        )
    }
}

fn test_config(trial_days: u32) -> AppConfig {
    AppConfig {
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        session_token_ttl: Duration::hours(1),
        app_origin: Url::parse("http://localhost:3000").unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
        redis_url: String::new(),
        rate_limit_window_secs: 60,
        rate_limit_per_ip: 60,
        database_url: String::new(),
        trust_proxy: false,
        stripe_secret_key: SecretString::new("sk_test_dummy".into()),
        stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        stripe_price_id: "price_test_premium".to_string(),
        trial_days,
        past_due_grace_hours: None,
    }
}

/// Session token for `user_id`, signed with the state's JWT secret.
pub fn session_token(app_state: &AppState, user_id: Uuid) -> String {
    jwt::issue(
        user_id,
        Tier::Free,
        &app_state.config.jwt_secret,
        app_state.config.session_token_ttl,
    )
    .unwrap()
}
