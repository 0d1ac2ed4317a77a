use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::entitlement::{Entitlement, EntitlementPolicy, Transition},
};

/// Attempts made to commit a transition before giving up on concurrent writers.
pub const MAX_APPLY_ATTEMPTS: usize = 3;

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait EntitlementRepo: Send + Sync {
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<Entitlement>>;

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<Entitlement>>;

    /// Writes `next` only if the stored version still equals
    /// `expected_version`. Returns the stored record (with its bumped version)
    /// on success and `None` when another writer got there first.
    async fn compare_and_set(
        &self,
        next: &Entitlement,
        expected_version: i64,
    ) -> AppResult<Option<Entitlement>>;
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(Entitlement),
    /// The transition produced the state already stored.
    Unchanged(Entitlement),
    /// The event predates the newest one applied to the record.
    Stale,
}

/// Record plus the evaluated access flag, as returned to the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementView {
    #[serde(flatten)]
    pub record: Entitlement,
    pub is_premium: bool,
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct EntitlementUseCases {
    repo: Arc<dyn EntitlementRepo>,
    policy: EntitlementPolicy,
}

impl EntitlementUseCases {
    pub fn new(repo: Arc<dyn EntitlementRepo>, policy: EntitlementPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> EntitlementPolicy {
        self.policy
    }

    pub async fn get(&self, user_id: Uuid) -> AppResult<Option<Entitlement>> {
        self.repo.get_by_user_id(user_id).await
    }

    pub async fn find_by_customer(&self, customer_id: &str) -> AppResult<Option<Entitlement>> {
        self.repo.get_by_customer_id(customer_id).await
    }

    /// Evaluates access at `now`. Nothing is cached between calls.
    pub async fn view(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<EntitlementView> {
        let record = self
            .repo
            .get_by_user_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let is_premium = self.policy.is_premium(&record, now);
        Ok(EntitlementView { record, is_premium })
    }

    /// Read-modify-write of one record guarded by its version.
    ///
    /// When `event_at` is set, non-deletion transitions older than the
    /// record's `last_event_at` are skipped. On a version conflict the record
    /// is re-read and the transition re-applied, up to [`MAX_APPLY_ATTEMPTS`].
    pub async fn apply(
        &self,
        user_id: Uuid,
        transition: &Transition,
        event_at: Option<DateTime<Utc>>,
    ) -> AppResult<ApplyOutcome> {
        for attempt in 1..=MAX_APPLY_ATTEMPTS {
            let current = self
                .repo
                .get_by_user_id(user_id)
                .await?
                .ok_or(AppError::NotFound)?;

            if let Some(at) = event_at
                && !transition.is_deletion()
                && current.is_stale(at)
            {
                tracing::info!(
                    %user_id,
                    event_at = %at,
                    last_event_at = ?current.last_event_at,
                    "Skipping out-of-order billing event"
                );
                return Ok(ApplyOutcome::Stale);
            }

            let next = current.apply(transition, event_at)?;
            if next == current {
                return Ok(ApplyOutcome::Unchanged(current));
            }

            match self.repo.compare_and_set(&next, current.version).await? {
                Some(stored) => {
                    tracing::debug!(
                        %user_id,
                        tier = %stored.tier,
                        status = %stored.status,
                        version = stored.version,
                        "Entitlement updated"
                    );
                    return Ok(ApplyOutcome::Applied(stored));
                }
                None => {
                    tracing::warn!(
                        %user_id,
                        attempt,
                        expected_version = current.version,
                        "Entitlement version conflict, retrying"
                    );
                }
            }
        }

        Err(AppError::VersionConflict)
    }
}
