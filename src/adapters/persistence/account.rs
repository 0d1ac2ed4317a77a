use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    adapters::persistence::{
        PostgresPersistence,
        entitlement::{EntitlementDb, SELECT_COLS},
    },
    app_error::{AppError, AppResult},
    domain::entities::{account::Account, entitlement::Entitlement},
    use_cases::account::AccountRepo,
};

// Account row as stored in the db.
#[derive(sqlx::FromRow, Debug)]
struct AccountDb {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AccountDb> for Account {
    fn from(row: AccountDb) -> Self {
        Account {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AccountRepo for PostgresPersistence {
    async fn create_with_entitlement(
        &self,
        email: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<(Account, Entitlement)> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        let account = sqlx::query_as::<_, AccountDb>(
            r#"
                INSERT INTO users (id, email, display_name, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, email, display_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(display_name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let initial = Entitlement::new_free(account.id, now);
        let record = sqlx::query_as::<_, EntitlementDb>(&format!(
            r#"
                INSERT INTO entitlements (user_id, tier, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING {SELECT_COLS}
            "#
        ))
        .bind(initial.user_id)
        .bind(initial.tier)
        .bind(initial.status)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;

        Ok((account.into(), record.into()))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountDb>(
            "SELECT id, email, display_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountDb>(
            "SELECT id, email, display_name, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(Into::into))
    }
}
