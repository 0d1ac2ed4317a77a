//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    billing_event::SubscriptionSnapshot, entitlement::Entitlement,
    subscription_status::SubscriptionStatus,
};

/// Fixed timestamp for reproducible fixtures.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Create a free, active entitlement record with no billing identity.
pub fn create_test_entitlement(overrides: impl FnOnce(&mut Entitlement)) -> Entitlement {
    let mut record = Entitlement::new_free(Uuid::new_v4(), test_datetime());
    overrides(&mut record);
    record
}

/// Create an active subscription snapshot whose current period covers now.
pub fn create_test_snapshot(
    overrides: impl FnOnce(&mut SubscriptionSnapshot),
) -> SubscriptionSnapshot {
    let now = Utc::now();
    let mut snapshot = SubscriptionSnapshot {
        subscription_id: "sub_test".to_string(),
        customer_id: "cus_test".to_string(),
        status: SubscriptionStatus::Active,
        current_period_start: Some(now - Duration::days(1)),
        current_period_end: Some(now + Duration::days(29)),
        trial_start: None,
        trial_end: None,
        cancel_at_period_end: false,
    };
    overrides(&mut snapshot);
    snapshot
}
