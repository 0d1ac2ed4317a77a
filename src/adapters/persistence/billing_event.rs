use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    use_cases::webhook::{BillingEventRecord, BillingEventRepo},
};

#[async_trait]
impl BillingEventRepo for PostgresPersistence {
    async fn exists(&self, provider_event_id: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM billing_events WHERE provider_event_id = $1)",
        )
        .bind(provider_event_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(exists)
    }

    async fn record(&self, record: &BillingEventRecord) -> AppResult<()> {
        sqlx::query(
            r#"
                INSERT INTO billing_events
                    (provider_event_id, event_type, user_id, outcome, event_created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (provider_event_id) DO NOTHING
            "#,
        )
        .bind(&record.provider_event_id)
        .bind(&record.event_type)
        .bind(record.user_id)
        .bind(&record.outcome)
        .bind(record.event_created_at)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
