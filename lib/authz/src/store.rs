use async_trait::async_trait;
use ebookdes_core::UserId;

use crate::error::RoleStoreError;

/// Read access to the role table.
///
/// Implementations must read with elevated access: the caller's own
/// row-level permissions are irrelevant to what role they hold.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Returns the raw role value for `user_id`, or `None` if there is no row.
    async fn find_role(&self, user_id: UserId) -> Result<Option<String>, RoleStoreError>;
}
