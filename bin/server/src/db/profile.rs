//! Profile mirror of identity-provider users.

use async_trait::async_trait;
use ebookdes_platform_access::{ProfileStore, ProfileStoreError, User};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the profile or refreshes its fields. A missing name or avatar
    /// keeps what is already stored.
    pub async fn upsert(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, full_name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET email = COALESCE(EXCLUDED.email, profiles.email),
                full_name = COALESCE(EXCLUDED.full_name, profiles.full_name),
                avatar_url = COALESCE(EXCLUDED.avatar_url, profiles.avatar_url),
                updated_at = NOW()
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email())
        .bind(user.full_name())
        .bind(user.avatar_url())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn upsert_profile(&self, user: &User) -> Result<(), ProfileStoreError> {
        self.upsert(user).await.map_err(|e| ProfileStoreError {
            details: e.to_string(),
        })
    }
}
