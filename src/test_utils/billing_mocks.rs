//! In-memory mock implementations for the billing repositories and provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::billing_provider::{
            BillingProviderPort, CheckoutSessionInfo, CheckoutSessionResult,
            CheckoutSessionStatus, CheckoutUrls, CustomerId, SetupIntentInfo, SetupIntentStatus,
        },
        use_cases::{
            account::AccountRepo,
            entitlement::EntitlementRepo,
            webhook::{BillingEventRecord, BillingEventRepo},
        },
    },
    domain::entities::{
        account::Account, billing_event::SubscriptionSnapshot, entitlement::Entitlement,
        subscription_status::SubscriptionStatus,
    },
};

// ============================================================================
// InMemoryEntitlementRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryEntitlementRepo {
    pub records: Mutex<HashMap<Uuid, Entitlement>>,
    failing_writes: AtomicUsize,
    failing_reads: AtomicBool,
}

impl InMemoryEntitlementRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Entitlement>) -> Self {
        let map = records.into_iter().map(|r| (r.user_id, r)).collect();
        Self {
            records: Mutex::new(map),
            ..Self::default()
        }
    }

    pub fn insert(&self, record: Entitlement) {
        self.records.lock().unwrap().insert(record.user_id, record);
    }

    pub fn get(&self, user_id: Uuid) -> Option<Entitlement> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }

    /// Mutates a stored record in place without bumping its version.
    pub fn update(&self, user_id: Uuid, f: impl FnOnce(&mut Entitlement)) {
        if let Some(record) = self.records.lock().unwrap().get_mut(&user_id) {
            f(record);
        }
    }

    /// The next `n` compare-and-set calls report a lost race.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Makes every read fail like an unreachable database.
    pub fn fail_reads(&self, fail: bool) {
        self.failing_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(AppError::Database("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementRepo for InMemoryEntitlementRepo {
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<Entitlement>> {
        self.check_reads()?;
        Ok(self.get(user_id))
    }

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<Entitlement>> {
        self.check_reads()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn compare_and_set(
        &self,
        next: &Entitlement,
        expected_version: i64,
    ) -> AppResult<Option<Entitlement>> {
        let pending = self.failing_writes.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_writes.store(pending - 1, Ordering::SeqCst);
            return Ok(None);
        }

        let mut records = self.records.lock().unwrap();
        match records.get(&next.user_id) {
            Some(current) if current.version == expected_version => {}
            _ => return Ok(None),
        }

        let mut stored = next.clone();
        stored.version = expected_version + 1;
        stored.updated_at = Utc::now();
        records.insert(stored.user_id, stored.clone());
        Ok(Some(stored))
    }
}

// ============================================================================
// InMemoryAccountRepo
// ============================================================================

/// Account store that writes the initial entitlement into a shared
/// [`InMemoryEntitlementRepo`], mirroring the single database transaction.
pub struct InMemoryAccountRepo {
    pub accounts: Mutex<HashMap<Uuid, Account>>,
    entitlements: Arc<InMemoryEntitlementRepo>,
}

impl InMemoryAccountRepo {
    pub fn new(entitlements: Arc<InMemoryEntitlementRepo>) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            entitlements,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl AccountRepo for InMemoryAccountRepo {
    async fn create_with_entitlement(
        &self,
        email: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<(Account, Entitlement)> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.values().any(|a| a.email == email) {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
            created_at: now,
        };
        let record = Entitlement::new_free(account.id, now);

        accounts.insert(account.id, account.clone());
        self.entitlements.insert(record.clone());
        Ok((account, record))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.get(id))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }
}

// ============================================================================
// InMemoryBillingEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryBillingEventRepo {
    pub events: Mutex<HashMap<String, BillingEventRecord>>,
}

impl InMemoryBillingEventRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, provider_event_id: &str) -> bool {
        self.events.lock().unwrap().contains_key(provider_event_id)
    }

    pub fn get(&self, provider_event_id: &str) -> Option<BillingEventRecord> {
        self.events.lock().unwrap().get(provider_event_id).cloned()
    }
}

#[async_trait]
impl BillingEventRepo for InMemoryBillingEventRepo {
    async fn exists(&self, provider_event_id: &str) -> AppResult<bool> {
        Ok(self.contains(provider_event_id))
    }

    async fn record(&self, record: &BillingEventRecord) -> AppResult<()> {
        self.events
            .lock()
            .unwrap()
            .entry(record.provider_event_id.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }
}

// ============================================================================
// StubBillingProvider
// ============================================================================

/// Billing provider double. Sessions, setup intents and subscriptions live in
/// memory; IDs are sequential and prefixed like the real ones.
#[derive(Default)]
pub struct StubBillingProvider {
    next_id: AtomicUsize,
    checkout_sessions: Mutex<HashMap<String, CheckoutSessionInfo>>,
    setup_intents: Mutex<HashMap<String, SetupIntentInfo>>,
    subscriptions: Mutex<HashMap<String, SubscriptionSnapshot>>,
    trial_subscriptions_by_key: Mutex<HashMap<String, SubscriptionSnapshot>>,
    default_payment_method_calls: AtomicUsize,
    trial_subscription_calls: AtomicUsize,
    customers_created: AtomicUsize,
    fail_next_setup_checkout: AtomicBool,
    last_subscription_checkout_trial_days: Mutex<Option<u32>>,
}

impl StubBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_test_{n}")
    }

    fn hosted_session(&self, info: CheckoutSessionInfo) -> CheckoutSessionResult {
        let result = CheckoutSessionResult {
            session_id: info.session_id.clone(),
            url: format!("https://checkout.stripe.test/c/pay/{}", info.session_id),
        };
        self.insert_checkout_session(info);
        result
    }

    /// Simulates the customer finishing a setup-mode checkout. Returns the
    /// succeeded setup intent's ID.
    pub fn complete_setup_checkout(&self, session_id: &str, customer_id: &str) -> String {
        let setup_intent_id = self.next_id("seti");
        self.insert_setup_intent(SetupIntentInfo {
            setup_intent_id: setup_intent_id.clone(),
            status: SetupIntentStatus::Succeeded,
            customer_id: Some(CustomerId::new(customer_id)),
            payment_method_id: Some(self.next_id("pm")),
        });

        if let Some(session) = self.checkout_sessions.lock().unwrap().get_mut(session_id) {
            session.status = CheckoutSessionStatus::Complete;
            session.setup_intent_id = Some(setup_intent_id.clone());
        }
        setup_intent_id
    }

    pub fn insert_checkout_session(&self, info: CheckoutSessionInfo) {
        self.checkout_sessions
            .lock()
            .unwrap()
            .insert(info.session_id.clone(), info);
    }

    pub fn insert_setup_intent(&self, info: SetupIntentInfo) {
        self.setup_intents
            .lock()
            .unwrap()
            .insert(info.setup_intent_id.clone(), info);
    }

    pub fn update_setup_intent(&self, setup_intent_id: &str, f: impl FnOnce(&mut SetupIntentInfo)) {
        if let Some(intent) = self.setup_intents.lock().unwrap().get_mut(setup_intent_id) {
            f(intent);
        }
    }

    pub fn insert_subscription(&self, snapshot: SubscriptionSnapshot) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(snapshot.subscription_id.clone(), snapshot);
    }

    /// The next `create_setup_checkout` fails like a provider outage.
    pub fn fail_next_setup_checkout(&self) {
        self.fail_next_setup_checkout.store(true, Ordering::SeqCst);
    }

    pub fn customers_created(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }

    pub fn default_payment_method_calls(&self) -> usize {
        self.default_payment_method_calls.load(Ordering::SeqCst)
    }

    pub fn trial_subscription_calls(&self) -> usize {
        self.trial_subscription_calls.load(Ordering::SeqCst)
    }

    pub fn last_subscription_checkout_trial_days(&self) -> Option<u32> {
        *self.last_subscription_checkout_trial_days.lock().unwrap()
    }
}

#[async_trait]
impl BillingProviderPort for StubBillingProvider {
    async fn create_customer(&self, _email: &str, _user_id: Uuid) -> AppResult<CustomerId> {
        self.customers_created.fetch_add(1, Ordering::SeqCst);
        Ok(CustomerId::new(self.next_id("cus")))
    }

    async fn create_setup_checkout(
        &self,
        customer: &CustomerId,
        user_id: Uuid,
        _urls: &CheckoutUrls,
    ) -> AppResult<CheckoutSessionResult> {
        if self.fail_next_setup_checkout.swap(false, Ordering::SeqCst) {
            return Err(AppError::Provider("Stripe returned 503".into()));
        }
        Ok(self.hosted_session(CheckoutSessionInfo {
            session_id: self.next_id("cs"),
            status: CheckoutSessionStatus::Open,
            customer_id: Some(customer.clone()),
            subscription_id: None,
            setup_intent_id: None,
            user_ref: Some(user_id.to_string()),
        }))
    }

    async fn create_subscription_checkout(
        &self,
        customer: &CustomerId,
        user_id: Uuid,
        trial_days: u32,
        _urls: &CheckoutUrls,
    ) -> AppResult<CheckoutSessionResult> {
        *self.last_subscription_checkout_trial_days.lock().unwrap() = Some(trial_days);
        Ok(self.hosted_session(CheckoutSessionInfo {
            session_id: self.next_id("cs"),
            status: CheckoutSessionStatus::Open,
            customer_id: Some(customer.clone()),
            subscription_id: None,
            setup_intent_id: None,
            user_ref: Some(user_id.to_string()),
        }))
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<CheckoutSessionInfo>> {
        Ok(self.checkout_sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn get_setup_intent(&self, setup_intent_id: &str) -> AppResult<Option<SetupIntentInfo>> {
        Ok(self.setup_intents.lock().unwrap().get(setup_intent_id).cloned())
    }

    async fn set_default_payment_method(
        &self,
        _customer: &CustomerId,
        _payment_method_id: &str,
    ) -> AppResult<()> {
        self.default_payment_method_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_trial_subscription(
        &self,
        customer: &CustomerId,
        _payment_method_id: &str,
        trial_days: u32,
        idempotency_key: &str,
    ) -> AppResult<SubscriptionSnapshot> {
        let mut by_key = self.trial_subscriptions_by_key.lock().unwrap();
        if let Some(existing) = by_key.get(idempotency_key) {
            return Ok(existing.clone());
        }

        self.trial_subscription_calls.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let trial_end = now + Duration::days(i64::from(trial_days));
        let snapshot = SubscriptionSnapshot {
            subscription_id: self.next_id("sub"),
            customer_id: customer.to_string(),
            status: SubscriptionStatus::Trialing,
            current_period_start: Some(now),
            current_period_end: Some(trial_end),
            trial_start: Some(now),
            trial_end: Some(trial_end),
            cancel_at_period_end: false,
        };
        self.insert_subscription(snapshot.clone());
        by_key.insert(idempotency_key.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<SubscriptionSnapshot>> {
        Ok(self.subscriptions.lock().unwrap().get(subscription_id).cloned())
    }

    async fn create_portal_session(
        &self,
        customer: &CustomerId,
        _return_url: &str,
    ) -> AppResult<String> {
        Ok(format!("https://billing.stripe.test/p/session/{customer}"))
    }
}

// ============================================================================
// InMemoryRateLimiter
// ============================================================================

/// In-memory rate limiter for testing.
/// Uses HashMap to track request counts per IP.
pub struct InMemoryRateLimiter {
    counts: Mutex<HashMap<String, u64>>,
    max_per_ip: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_per_ip: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_per_ip,
        }
    }

    /// Create a permissive rate limiter that never blocks (for most tests).
    pub fn permissive() -> Self {
        Self::new(u64::MAX)
    }
}

#[async_trait]
impl crate::infra::RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, ip: &str) -> AppResult<()> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(format!("rate:ip:{ip}")).or_insert(0);
        *count += 1;
        if *count > self.max_per_ip {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}
