use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::{
        entitlement::Entitlement, subscription_status::SubscriptionStatus, tier::Tier,
    },
    use_cases::entitlement::EntitlementRepo,
};

pub(crate) const SELECT_COLS: &str = "user_id, tier, status, customer_id, subscription_id, \
    trial_start_date, trial_end_date, subscription_start_date, subscription_end_date, \
    cancel_at_period_end, payment_method_attached, last_event_at, version, created_at, updated_at";

// Entitlement row as stored in the db.
#[derive(sqlx::FromRow, Debug)]
pub(crate) struct EntitlementDb {
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
    pub last_event_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EntitlementDb> for Entitlement {
    fn from(row: EntitlementDb) -> Self {
        Entitlement {
            user_id: row.user_id,
            tier: row.tier,
            status: row.status,
            customer_id: row.customer_id,
            subscription_id: row.subscription_id,
            trial_start_date: row.trial_start_date,
            trial_end_date: row.trial_end_date,
            subscription_start_date: row.subscription_start_date,
            subscription_end_date: row.subscription_end_date,
            cancel_at_period_end: row.cancel_at_period_end,
            payment_method_attached: row.payment_method_attached,
            last_event_at: row.last_event_at,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl EntitlementRepo for PostgresPersistence {
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<Entitlement>> {
        let row = sqlx::query_as::<_, EntitlementDb>(&format!(
            "SELECT {SELECT_COLS} FROM entitlements WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(Into::into))
    }

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<Entitlement>> {
        let row = sqlx::query_as::<_, EntitlementDb>(&format!(
            "SELECT {SELECT_COLS} FROM entitlements WHERE customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(Into::into))
    }

    async fn compare_and_set(
        &self,
        next: &Entitlement,
        expected_version: i64,
    ) -> AppResult<Option<Entitlement>> {
        let row = sqlx::query_as::<_, EntitlementDb>(&format!(
            r#"
                UPDATE entitlements SET
                    tier = $3,
                    status = $4,
                    customer_id = $5,
                    subscription_id = $6,
                    trial_start_date = $7,
                    trial_end_date = $8,
                    subscription_start_date = $9,
                    subscription_end_date = $10,
                    cancel_at_period_end = $11,
                    payment_method_attached = $12,
                    last_event_at = $13,
                    version = version + 1,
                    updated_at = now()
                WHERE user_id = $1 AND version = $2
                RETURNING {SELECT_COLS}
            "#
        ))
        .bind(next.user_id)
        .bind(expected_version)
        .bind(next.tier)
        .bind(next.status)
        .bind(&next.customer_id)
        .bind(&next.subscription_id)
        .bind(next.trial_start_date)
        .bind(next.trial_end_date)
        .bind(next.subscription_start_date)
        .bind(next.subscription_end_date)
        .bind(next.cancel_at_period_end)
        .bind(next.payment_method_attached)
        .bind(next.last_event_at)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(Into::into))
    }
}
