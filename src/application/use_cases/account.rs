use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{account::Account, entitlement::Entitlement},
};

#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Inserts the account and its default free entitlement atomically.
    /// A duplicate email fails with `AppError::InvalidInput`.
    async fn create_with_entitlement(
        &self,
        email: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<(Account, Entitlement)>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Lookup by already-normalized email.
    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>>;
}
