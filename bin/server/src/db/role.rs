//! Role lookups against `user_roles`.

use async_trait::async_trait;
use ebookdes_authz::{RoleStore, RoleStoreError};
use ebookdes_core::UserId;
use sqlx::PgPool;

/// Reads role rows with elevated access.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Raw role value, `None` when the user has no row.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl RoleStore for RoleRepository {
    async fn find_role(&self, user_id: UserId) -> Result<Option<String>, RoleStoreError> {
        self.find_by_user(user_id)
            .await
            .map_err(|e| RoleStoreError::QueryFailed {
                details: e.to_string(),
            })
    }
}
